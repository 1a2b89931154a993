use crate::helpers::TestApp;

#[tokio::test]
async fn lists_require_authentication() {
    let test_app = TestApp::spawn_app().await;

    let create = test_app
        .api_client
        .post(&format!("{}/api/lists", test_app.address))
        .json(&serde_json::json!({ "name": "Newsletter" }))
        .send()
        .await
        .expect("Failed to execute request.");
    let delete = test_app
        .api_client
        .delete(&format!("{}/api/lists/1", test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, create.status().as_u16());
    assert_eq!(401, delete.status().as_u16());
}

#[tokio::test]
async fn create_list_returns_201_and_is_listed() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;

    let response = test_app
        .post_list(
            &token,
            serde_json::json!({ "name": "  Weekly  ", "description": "Weekly digest" }),
        )
        .await;

    assert_eq!(201, response.status().as_u16());

    let lists: serde_json::Value = test_app
        .api_client
        .get(&format!("{}/api/lists", test_app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.")
        .json()
        .await
        .unwrap();

    assert_eq!(lists.as_array().map(Vec::len), Some(1));
    assert_eq!(lists[0]["name"], "Weekly");
    assert_eq!(lists[0]["description"], "Weekly digest");
}

#[tokio::test]
async fn create_list_returns_400_for_a_blank_name() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;

    let response = test_app
        .post_list(&token, serde_json::json!({ "name": "   " }))
        .await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn delete_list_removes_its_memberships() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;
    let list_id = test_app.create_list(&token, "Temporary").await;

    test_app
        .import_csv(&token, "Email\nana@test.com\nbob@test.com\n", Some(list_id))
        .await;
    assert_eq!(test_app.membership_count(list_id).await, 2);

    let response = test_app
        .api_client
        .delete(&format!("{}/api/lists/{}", test_app.address, list_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
    assert_eq!(test_app.membership_count(list_id).await, 0);
    // Subscribers outlive the list
    assert_eq!(test_app.subscriber_count().await, 2);
}

#[tokio::test]
async fn delete_unknown_list_returns_404() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;

    let response = test_app
        .api_client
        .delete(&format!("{}/api/lists/999999", test_app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(404, response.status().as_u16());
}
