//! E2E tests against a running server instance.
//! Start the server with CORKBOARD_TEST_SEED=1 and run:
//!     cargo test --test e2e_board -- --ignored

use reqwest::Client;

const BASE_URL: &str = "http://localhost:3000";

/// Helper to create an authenticated admin session via /test/seed
async fn create_test_session(client: &Client) -> Result<String, Box<dyn std::error::Error>> {
    let response = client.get(format!("{}/test/seed", BASE_URL)).send().await?;

    let cookie_value = response
        .cookies()
        .find(|c| c.name() == "corkboard_session")
        .map(|c| c.value().to_string());

    cookie_value.ok_or_else(|| "No session cookie returned".into())
}

#[tokio::test]
#[ignore]
async fn test_feed_loads() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::builder().cookie_store(true).build()?;

    let _session = create_test_session(&client).await?;

    let response = client.get(format!("{}/workers", BASE_URL)).send().await?;
    assert_eq!(response.status(), 200);
    let body = response.text().await?;
    assert!(body.contains("Workers feed"));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_admin_panel_loads_for_seeded_admin() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::builder().cookie_store(true).build()?;

    let _session = create_test_session(&client).await?;

    let response = client.get(format!("{}/admin", BASE_URL)).send().await?;
    assert_eq!(response.status(), 200);
    let body = response.text().await?;
    assert!(body.contains("Admin panel"));
    assert!(body.contains("testadmin"));

    Ok(())
}

#[tokio::test]
#[ignore]
async fn test_publish_and_delete_post() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::builder().cookie_store(true).build()?;

    let _session = create_test_session(&client).await?;

    let form = reqwest::multipart::Form::new()
        .text("title", "E2E post")
        .text("content", "Written by the e2e test");
    let response = client
        .post(format!("{}/workers", BASE_URL))
        .multipart(form)
        .send()
        .await?;
    assert_eq!(response.status(), 200); // after redirect to the feed

    let body = client
        .get(format!("{}/workers", BASE_URL))
        .send()
        .await?
        .text()
        .await?;
    assert!(body.contains("E2E post"));

    // Clean up: delete it again through the feed
    let start = body.find("/workers/delete_post/").unwrap() + "/workers/delete_post/".len();
    let post_id: String = body[start..].chars().take_while(|c| *c != '"').collect();

    let response = client
        .post(format!("{}/workers/delete_post/{}", BASE_URL, post_id))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    Ok(())
}
