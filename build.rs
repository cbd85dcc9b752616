use std::process::Command;

fn main() {
    // Only rebuild CSS when template or CSS files change
    println!("cargo:rerun-if-changed=assets/css/input.css");
    println!("cargo:rerun-if-changed=templates/");

    // Try to run Tailwind CSS standalone CLI
    let status = Command::new("tailwindcss")
        .args([
            "-i",
            "assets/css/input.css",
            "-o",
            "assets/css/output.css",
            "--minify",
        ])
        .status();

    match status {
        Ok(s) if s.success() => {
            println!("cargo:warning=Tailwind CSS compiled successfully");
        }
        _ => {
            // Tailwind CLI not available — write a plain stylesheet covering
            // the classes the templates use
            println!("cargo:warning=Tailwind CLI not found, using fallback CSS");
            let fallback = r#"*, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: system-ui, -apple-system, sans-serif; line-height: 1.6; color: #1c1917; background: #fafaf9; -webkit-font-smoothing: antialiased; }
a { color: inherit; text-decoration: none; }
a:hover { opacity: 0.8; }
.nav { background: #fff; border-bottom: 1px solid #e7e5e4; }
.nav-inner { max-width: 56rem; margin: 0 auto; padding: 0.75rem 1rem; display: flex; align-items: center; gap: 1rem; }
.brand { font-weight: 700; font-size: 1.125rem; }
.nav-links { margin-left: auto; display: flex; align-items: center; gap: 0.75rem; font-size: 0.875rem; }
.nav-user { color: #78716c; }
.container { max-width: 56rem; margin: 0 auto; padding: 1.5rem 1rem 4rem; }
.hero { text-align: center; padding: 4rem 1rem; }
.hero h1 { font-size: 2.25rem; font-weight: 700; margin-bottom: 0.5rem; }
.hero-actions { display: flex; justify-content: center; gap: 0.75rem; margin-top: 1rem; }
.muted { color: #78716c; font-size: 0.875rem; }
.empty-state { text-align: center; padding: 2rem 0; }
.card { background: #fff; border-radius: 0.75rem; border: 1px solid #e7e5e4; padding: 1.5rem; box-shadow: 0 1px 2px 0 rgb(0 0 0 / 0.05); margin-bottom: 1rem; }
.card h1 { font-size: 1.5rem; font-weight: 700; margin-bottom: 0.75rem; }
.card h2 { font-size: 1.125rem; font-weight: 600; margin-bottom: 0.75rem; }
.form-card { max-width: 28rem; margin: 2rem auto; }
.field { display: block; margin-bottom: 0.75rem; }
.field span { display: block; font-size: 0.875rem; font-weight: 500; margin-bottom: 0.25rem; }
.field input, .field textarea { width: 100%; padding: 0.5rem 0.75rem; border: 1px solid #d6d3d1; border-radius: 0.5rem; font: inherit; }
.field input:focus, .field textarea:focus { outline: 2px solid #1c1917; outline-offset: -1px; }
.btn { display: inline-flex; align-items: center; justify-content: center; padding: 0.5rem 1rem; border-radius: 0.5rem; font-size: 0.875rem; font-weight: 500; transition: all 0.15s; cursor: pointer; text-decoration: none; border: none; font-family: inherit; }
.btn-primary { background: #1c1917; color: #fff; }
.btn-primary:hover { background: #44403c; }
.btn-secondary { background: #fff; color: #1c1917; border: 1px solid #d6d3d1; }
.btn-secondary:hover { background: #f5f5f4; }
.btn-danger { background: #fff; color: #b91c1c; border: 1px solid #fecaca; }
.btn-danger:hover { background: #fef2f2; }
.alert { padding: 0.75rem 1rem; border-radius: 0.5rem; margin-bottom: 1rem; font-size: 0.875rem; }
.alert-success { background: #f0fdf4; color: #166534; border: 1px solid #bbf7d0; }
.alert-error { background: #fef2f2; color: #991b1b; border: 1px solid #fecaca; }
.alert-warning { background: #fffbeb; color: #92400e; border: 1px solid #fde68a; }
.search-form { display: flex; gap: 0.5rem; align-items: center; }
.search-form input { flex: 1; padding: 0.5rem 0.75rem; border: 1px solid #d6d3d1; border-radius: 0.5rem; font: inherit; }
.inline-form { display: inline; }
.post-header { display: flex; align-items: baseline; justify-content: space-between; gap: 1rem; flex-wrap: wrap; }
.post-body { white-space: pre-wrap; margin: 0.5rem 0 0.75rem; }
.post-photo { max-width: 100%; border-radius: 0.5rem; margin-bottom: 0.75rem; }
.table { width: 100%; border-collapse: collapse; font-size: 0.875rem; }
.table th { text-align: left; font-weight: 600; padding: 0.5rem 0.75rem; border-bottom: 1px solid #e7e5e4; }
.table td { padding: 0.5rem 0.75rem; border-bottom: 1px solid #f5f5f4; }
.row-actions { display: flex; gap: 0.5rem; justify-content: flex-end; }
"#;
            std::fs::create_dir_all("assets/css").ok();
            std::fs::write("assets/css/output.css", fallback).ok();
        }
    }
}
