use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

async fn mount_phone_score(test_app: &TestApp, score: u32) {
    Mock::given(method("GET"))
        .and(path("/phone_intel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_valid": true,
            "risk_score": score,
            "line_type": "Mobile"
        })))
        .mount(&test_app.phone_server)
        .await;
}

#[tokio::test]
async fn add_subscriber_returns_201_when_body_is_valid() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/phone_intel"))
        .and(query_param("phone", "15551234567"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_valid": true,
            "risk_score": 5
        })))
        .expect(1)
        .mount(&test_app.phone_server)
        .await;

    let response = test_app
        .post_subscriber(serde_json::json!({
            "email": "  frank@test.com ",
            "name": "Frank",
            "phone": "(555) 123-4567"
        }))
        .await;

    assert_eq!(201, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["email"], "frank@test.com");
    assert_eq!(body["validation"]["verified"], true);

    let (email, name, phone): (String, Option<String>, Option<String>) =
        sqlx::query_as("SELECT email, name, phone FROM subscribers")
            .fetch_one(&test_app.db_pool)
            .await
            .expect("Failed to fetch saved subscriber.");

    assert_eq!(email, "frank@test.com");
    assert_eq!(name.as_deref(), Some("Frank"));
    assert_eq!(phone.as_deref(), Some("5551234567"));
}

#[tokio::test]
async fn add_subscriber_joins_the_requested_list() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;
    let list_id = test_app.create_list(&token, "Newsletter").await;

    mount_phone_score(&test_app, 5).await;

    let response = test_app
        .post_subscriber(serde_json::json!({
            "email": "frank@test.com",
            "phone": "5551234567",
            "listId": list_id.to_string()
        }))
        .await;

    assert_eq!(201, response.status().as_u16());
    assert_eq!(test_app.membership_count(list_id).await, 1);
}

#[tokio::test]
async fn add_subscriber_returns_400_when_data_is_missing_or_invalid() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.phone_server)
        .await;

    let test_cases = vec![
        (serde_json::json!({ "phone": "5551234567" }), "missing the email"),
        (serde_json::json!({ "email": "frank@test.com" }), "missing the phone"),
        (
            serde_json::json!({ "email": "not-an-email", "phone": "5551234567" }),
            "invalid email",
        ),
        (
            serde_json::json!({ "email": "frank@test.com", "phone": "555-1234" }),
            "too few phone digits",
        ),
    ];

    for (body, error_message) in test_cases {
        let response = test_app.post_subscriber(body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            error_message
        );
    }

    assert_eq!(test_app.subscriber_count().await, 0);
}

#[tokio::test]
async fn add_subscriber_returns_409_when_email_already_exists() {
    let test_app = TestApp::spawn_app().await;
    let body = serde_json::json!({
        "email": "frank@test.com",
        "phone": "5551234567"
    });

    mount_phone_score(&test_app, 5).await;

    let first = test_app.post_subscriber(body.clone()).await;
    let second = test_app.post_subscriber(body).await;

    assert_eq!(201, first.status().as_u16());
    assert_eq!(409, second.status().as_u16());
    assert_eq!(test_app.subscriber_count().await, 1);
}

#[tokio::test]
async fn add_subscriber_treats_email_case_as_the_same_subscriber() {
    let test_app = TestApp::spawn_app().await;

    mount_phone_score(&test_app, 5).await;

    let first = test_app
        .post_subscriber(serde_json::json!({
            "email": "frank@test.com",
            "phone": "5551234567"
        }))
        .await;
    let second = test_app
        .post_subscriber(serde_json::json!({
            "email": "Frank@Test.com",
            "phone": "5551234567"
        }))
        .await;

    assert_eq!(201, first.status().as_u16());
    assert_eq!(409, second.status().as_u16());
    assert_eq!(test_app.subscriber_count().await, 1);
}

#[tokio::test]
async fn add_subscriber_with_an_unknown_list_is_still_created() {
    let test_app = TestApp::spawn_app().await;
    let body = serde_json::json!({
        "email": "frank@test.com",
        "phone": "5551234567",
        "listId": 999
    });

    mount_phone_score(&test_app, 5).await;

    let first = test_app.post_subscriber(body.clone()).await;

    assert_eq!(201, first.status().as_u16());
    assert_eq!(test_app.subscriber_count().await, 1);
    assert_eq!(test_app.membership_count(999).await, 0);

    let retry = test_app.post_subscriber(body).await;

    assert_eq!(409, retry.status().as_u16());
    assert_eq!(test_app.subscriber_count().await, 1);
}

#[tokio::test]
async fn add_subscriber_blocks_bot_submissions() {
    let test_app = TestApp::spawn_app().await;

    mount_phone_score(&test_app, 95).await;

    let response = test_app
        .post_subscriber(serde_json::json!({
            "email": "bot@test.com",
            "phone": "5551234567"
        }))
        .await;

    assert_eq!(403, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "BOT_DETECTED");
    assert_eq!(test_app.subscriber_count().await, 0);
}

#[tokio::test]
async fn add_subscriber_rejects_numbers_reported_as_invalid() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "is_valid": false,
            "risk_score": 10
        })))
        .mount(&test_app.phone_server)
        .await;

    let response = test_app
        .post_subscriber(serde_json::json!({
            "email": "frank@test.com",
            "phone": "5551234567"
        }))
        .await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(test_app.subscriber_count().await, 0);
}

#[tokio::test]
async fn add_subscriber_is_accepted_when_verification_is_down() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&test_app.phone_server)
        .await;

    let response = test_app
        .post_subscriber(serde_json::json!({
            "email": "frank@test.com",
            "phone": "5551234567"
        }))
        .await;

    assert_eq!(201, response.status().as_u16());
    assert_eq!(test_app.subscriber_count().await, 1);
}

#[tokio::test]
async fn list_subscribers_requires_authentication() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .api_client
        .get(&format!("{}/api/subscribers", test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn list_subscribers_can_be_filtered_by_list() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;
    let list_id = test_app.create_list(&token, "VIP").await;

    mount_phone_score(&test_app, 5).await;

    test_app
        .post_subscriber(serde_json::json!({
            "email": "member@test.com",
            "phone": "5551234567",
            "listId": list_id
        }))
        .await;
    test_app
        .post_subscriber(serde_json::json!({
            "email": "other@test.com",
            "phone": "5557654321"
        }))
        .await;

    let all: serde_json::Value = test_app
        .get_subscribers(&token, None)
        .await
        .json()
        .await
        .unwrap();
    let members: serde_json::Value = test_app
        .get_subscribers(&token, Some(list_id))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(all.as_array().map(Vec::len), Some(2));
    assert_eq!(members.as_array().map(Vec::len), Some(1));
    assert_eq!(members[0]["email"], "member@test.com");
}
