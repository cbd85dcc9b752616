//! Full-stack tests: each test boots the app on an ephemeral port with a
//! fresh temporary data directory and drives it over HTTP.

use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use tempfile::TempDir;

use corkboard::config::{Cli, Config};
use corkboard::db;
use corkboard::routes;
use corkboard::state::AppState;

async fn spawn_app() -> (String, TempDir) {
    let tmp = TempDir::new().unwrap();
    let cli = Cli {
        config: None,
        host: None,
        port: None,
        data_dir: Some(tmp.path().to_path_buf()),
    };
    let config = Config::load(&cli).unwrap();
    std::fs::create_dir_all(config.uploads_path()).unwrap();

    let pool = db::create_pool(config.db_path()).unwrap();
    db::run_migrations(&pool).unwrap();

    let state = AppState::new(pool, config);
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), tmp)
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

async fn register(
    client: &Client,
    base: &str,
    name: &str,
    username: &str,
    password: &str,
    confirm: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/register", base))
        .form(&[
            ("name", name),
            ("surname", "Tester"),
            ("username", username),
            ("password", password),
            ("confirm_password", confirm),
        ])
        .send()
        .await
        .unwrap()
}

async fn login(client: &Client, base: &str, username: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{}/login", base))
        .form(&[("username", username), ("password", password)])
        .send()
        .await
        .unwrap()
}

async fn publish_post(client: &Client, base: &str, title: &str, content: &str) {
    let form = reqwest::multipart::Form::new()
        .text("title", title.to_string())
        .text("content", content.to_string());
    let response = client
        .post(format!("{}/workers", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

async fn feed_html(client: &Client, base: &str) -> String {
    let response = client.get(format!("{}/workers", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.text().await.unwrap()
}

/// Pull the first post id out of the feed markup via its view link.
fn first_post_id(html: &str) -> String {
    let start = html.find("/view_post/").expect("no post link in feed") + "/view_post/".len();
    html[start..]
        .chars()
        .take_while(|c| *c != '"')
        .collect()
}

#[tokio::test]
async fn protected_routes_redirect_anonymous_visitors_to_login() {
    let (base, _tmp) = spawn_app().await;
    let client = client();

    for path in ["/workers", "/admin"] {
        let response = client.get(format!("{}{}", base, path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }

    // Public pages stay public
    for path in ["/", "/about", "/login", "/register"] {
        let response = client.get(format!("{}{}", base, path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{} should be public", path);
    }
}

#[tokio::test]
async fn duplicate_username_is_rejected_whatever_the_other_fields() {
    let (base, _tmp) = spawn_app().await;
    let client = client();

    let response = register(&client, &base, "Alice", "alice", "pw1", "pw1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/login");

    // Same username, entirely different fields: re-rendered with the error
    let response = register(&client, &base, "Other", "alice", "pw2", "pw2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Username is already taken"));
    // Entered values are preserved in the re-rendered form
    assert!(body.contains(r#"value="Other""#));
}

#[tokio::test]
async fn password_mismatch_never_creates_an_account() {
    let (base, _tmp) = spawn_app().await;
    let client = client();

    let response = register(&client, &base, "Alice", "alice", "pw1", "pw2").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Passwords do not match"));

    // No record was created, so the username is still free
    let response = register(&client, &base, "Alice", "alice", "pw1", "pw1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn login_accepts_registered_credentials_and_rejects_wrong_ones() {
    let (base, _tmp) = spawn_app().await;
    let client = client();

    register(&client, &base, "Alice", "alice", "pw1", "pw1").await;

    let response = login(&client, &base, "alice", "wrong").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Invalid username or password"));

    let response = login(&client, &base, "alice", "pw1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/workers");

    // The session cookie now opens the feed
    let html = feed_html(&client, &base).await;
    assert!(html.contains("Workers feed"));

    // Logout drops the session
    let response = client.get(format!("{}/logout", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let response = client.get(format!("{}/workers", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn search_filters_posts_by_case_sensitive_substring() {
    let (base, _tmp) = spawn_app().await;
    let client = client();

    register(&client, &base, "Alice", "alice", "pw1", "pw1").await;
    login(&client, &base, "alice", "pw1").await;
    publish_post(&client, &base, "Plumbing help", "Kitchen sink leaks").await;
    publish_post(&client, &base, "Garden work", "Hedge needs trimming").await;

    // Absent query: all posts, stored order
    let html = feed_html(&client, &base).await;
    let plumbing = html.find("Plumbing help").unwrap();
    let garden = html.find("Garden work").unwrap();
    assert!(plumbing < garden);

    // Matching substring
    let response = client
        .get(format!("{}/workers?search=Plumbing", base))
        .send()
        .await
        .unwrap();
    let html = response.text().await.unwrap();
    assert!(html.contains("Plumbing help"));
    assert!(!html.contains("Garden work"));

    // Case matters
    let response = client
        .get(format!("{}/workers?search=plumbing", base))
        .send()
        .await
        .unwrap();
    let html = response.text().await.unwrap();
    assert!(!html.contains("Plumbing help"));
    assert!(html.contains("No posts found"));
}

#[tokio::test]
async fn ownership_rules_govern_post_deletion() {
    let (base, _tmp) = spawn_app().await;

    // First account on the board is the admin
    let admin = client();
    register(&admin, &base, "Root", "root", "adminpw", "adminpw").await;
    login(&admin, &base, "root", "adminpw").await;

    let alice = client();
    register(&alice, &base, "Alice", "alice", "pw1", "pw1").await;
    login(&alice, &base, "alice", "pw1").await;
    publish_post(&alice, &base, "T", "C").await;

    let html = feed_html(&alice, &base).await;
    assert!(html.contains(">T<"));
    let post_id = first_post_id(&html);

    // Bob is neither owner nor admin
    let bob = client();
    register(&bob, &base, "Bob", "bob", "pw2", "pw2").await;
    login(&bob, &base, "bob", "pw2").await;

    let response = bob
        .post(format!("{}/workers/delete_post/{}", base, post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/workers");

    // The refusal is a flash, and the post is still there
    let html = feed_html(&bob, &base).await;
    assert!(html.contains("You can only delete your own posts"));
    assert!(html.contains(">T<"));

    // The admin may delete anyone's post
    let response = admin
        .post(format!("{}/workers/delete_post/{}", base, post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = feed_html(&admin, &base).await;
    assert!(!html.contains(">T<"));

    // And the owner may delete their own
    publish_post(&alice, &base, "Mine", "Body").await;
    let post_id = first_post_id(&feed_html(&alice, &base).await);
    let response = alice
        .post(format!("{}/workers/delete_post/{}", base, post_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(!feed_html(&alice, &base).await.contains("Mine"));
}

#[tokio::test]
async fn photo_upload_round_trip_and_extension_check() {
    let (base, _tmp) = spawn_app().await;
    let client = client();

    register(&client, &base, "Alice", "alice", "pw1", "pw1").await;
    login(&client, &base, "alice", "pw1").await;

    // A disallowed extension is refused and no post is created
    let form = reqwest::multipart::Form::new()
        .text("title", "Bad upload")
        .text("content", "Should not appear")
        .part(
            "photo",
            reqwest::multipart::Part::bytes(b"MZ".to_vec()).file_name("tool.exe"),
        );
    let response = client
        .post(format!("{}/workers", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = feed_html(&client, &base).await;
    assert!(html.contains("File type is not allowed"));
    assert!(!html.contains("Bad upload"));

    // A png is accepted and served back from /uploads
    let form = reqwest::multipart::Form::new()
        .text("title", "With photo")
        .text("content", "See attached")
        .part(
            "photo",
            reqwest::multipart::Part::bytes(b"\x89PNG fake image".to_vec()).file_name("cat.png"),
        );
    let response = client
        .post(format!("{}/workers", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = feed_html(&client, &base).await;
    assert!(html.contains("With photo"));
    let start = html.find("/uploads/").unwrap() + "/uploads/".len();
    let filename: String = html[start..].chars().take_while(|c| *c != '"').collect();
    assert!(filename.ends_with(".png"));

    let response = client
        .get(format!("{}/uploads/{}", base, filename))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"\x89PNG fake image");
}

#[tokio::test]
async fn admin_panel_moderates_users_and_posts() {
    let (base, _tmp) = spawn_app().await;

    let admin = client();
    register(&admin, &base, "Root", "root", "adminpw", "adminpw").await;
    login(&admin, &base, "root", "adminpw").await;

    let alice = client();
    register(&alice, &base, "Alice", "alice", "pw1", "pw1").await;
    login(&alice, &base, "alice", "pw1").await;
    publish_post(&alice, &base, "Spam post", "Buy things").await;

    // A non-admin is turned away from the panel
    let response = alice.get(format!("{}/admin", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/login");

    // The panel lists both users and the post
    let response = admin.get(format!("{}/admin", base)).send().await.unwrap();
    let html = response.text().await.unwrap();
    assert!(html.contains("alice"));
    assert!(html.contains("root"));
    assert!(html.contains("Spam post"));

    // Edit the post
    let post_id = first_post_id(&html);
    let response = admin
        .post(format!("{}/admin/edit_post/{}", base, post_id))
        .form(&[
            ("name", "Alice"),
            ("surname", "Tester"),
            ("title", "Cleaned up"),
            ("content", "Moderated"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = feed_html(&admin, &base).await;
    assert!(html.contains("Cleaned up"));
    assert!(!html.contains("Spam post"));

    // Edit the user
    let response = admin.get(format!("{}/admin", base)).send().await.unwrap();
    let html = response.text().await.unwrap();
    let marker = "/admin/edit_user/";
    let mut alice_user_id = String::new();
    // The admin (created first) is listed first; take the second edit link
    let mut offset = 0;
    for _ in 0..2 {
        let start = html[offset..].find(marker).unwrap() + offset + marker.len();
        alice_user_id = html[start..].chars().take_while(|c| *c != '"').collect();
        offset = start;
    }
    let response = admin
        .post(format!("{}/admin/edit_user/{}", base, alice_user_id))
        .form(&[
            ("name", "Alicia"),
            ("surname", "Tester"),
            ("username", "alicia"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // Renaming onto an existing username is rejected inline
    let response = admin
        .post(format!("{}/admin/edit_user/{}", base, alice_user_id))
        .form(&[
            ("name", "Alicia"),
            ("surname", "Tester"),
            ("username", "root"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Username is already taken"));

    // Deleting the user removes them and their posts from the listings
    let response = admin
        .get(format!("{}/admin/delete_user/{}", base, alice_user_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // First load consumes the "Deleted user ..." flash; the second shows
    // the bare listings
    admin.get(format!("{}/admin", base)).send().await.unwrap();
    let response = admin.get(format!("{}/admin", base)).send().await.unwrap();
    let html = response.text().await.unwrap();
    assert!(!html.contains("alicia"));
    assert!(!html.contains("Cleaned up"));

    // Their session is gone with them
    let response = alice.get(format!("{}/workers", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn authenticated_visitors_skip_login_and_register_forms() {
    let (base, _tmp) = spawn_app().await;
    let client = client();

    register(&client, &base, "Alice", "alice", "pw1", "pw1").await;
    login(&client, &base, "alice", "pw1").await;

    for path in ["/login", "/register"] {
        let response = client.get(format!("{}{}", base, path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/workers");
    }
}
