use crate::helpers::TestApp;

const CONTACTS_CSV: &str = "\
Email,Name,Phone,Date Added,Stop Status
ana@test.com,Ana,(555) 000-0001,01/15/24 9:30am,0
bob@test.com,Bob,555.000.0002,garbage,1
,Nobody,5550000003,,
ana@test.com,Ana Again,5550000001,,
carl@test.com,Carl,,12/01/23 12:05pm,
";

#[tokio::test]
async fn import_requires_authentication() {
    let test_app = TestApp::spawn_app().await;
    let form = reqwest::multipart::Form::new().text("file", CONTACTS_CSV);

    let response = test_app
        .api_client
        .post(&format!("{}/api/subscribers/import", test_app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(401, response.status().as_u16());
    assert_eq!(test_app.subscriber_count().await, 0);
}

#[tokio::test]
async fn import_reports_counts_and_stores_rows() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;

    let response = test_app.import_csv(&token, CONTACTS_CSV, None).await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Import completed");
    assert_eq!(body["total"], 5);
    assert_eq!(body["imported"], 3);
    assert_eq!(body["duplicates"], 1);
    assert_eq!(body["skipped"], 1);
    assert!(body["duration"].as_str().unwrap().ends_with('s'));

    let (name, phone, stop_status): (Option<String>, Option<String>, i32) = sqlx::query_as(
        "SELECT name, phone, stop_status FROM subscribers WHERE email = 'bob@test.com'",
    )
    .fetch_one(&test_app.db_pool)
    .await
    .expect("Failed to fetch imported subscriber.");

    assert_eq!(name.as_deref(), Some("Bob"));
    assert_eq!(phone.as_deref(), Some("5550000002"));
    assert_eq!(stop_status, 1);
}

#[tokio::test]
async fn import_adds_every_valid_row_to_the_list() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;
    let list_id = test_app.create_list(&token, "Imported").await;

    let response = test_app.import_csv(&token, CONTACTS_CSV, Some(list_id)).await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(test_app.membership_count(list_id).await, 3);
}

#[tokio::test]
async fn reimporting_the_same_file_only_counts_duplicates() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;
    let list_id = test_app.create_list(&token, "Imported").await;

    test_app.import_csv(&token, CONTACTS_CSV, None).await;
    let response = test_app.import_csv(&token, CONTACTS_CSV, Some(list_id)).await;

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["imported"], 0);
    assert_eq!(body["duplicates"], 4);
    assert_eq!(test_app.subscriber_count().await, 3);
    // Existing subscribers still join the list
    assert_eq!(test_app.membership_count(list_id).await, 3);
}

#[tokio::test]
async fn import_counts_emails_differing_only_in_case_as_duplicates() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;
    let list_id = test_app.create_list(&token, "Imported").await;

    let response = test_app
        .import_csv(&token, "Email\nAna@Test.com\nana@test.com\n", Some(list_id))
        .await;

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["imported"], 1);
    assert_eq!(body["duplicates"], 1);
    assert_eq!(test_app.subscriber_count().await, 1);
    assert_eq!(test_app.membership_count(list_id).await, 1);
}

#[tokio::test]
async fn import_into_an_unknown_list_still_stores_the_rows() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;

    let response = test_app.import_csv(&token, CONTACTS_CSV, Some(999)).await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["imported"], 3);
    assert_eq!(test_app.membership_count(999).await, 0);
}

#[tokio::test]
async fn import_truncates_decimal_stop_status() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;

    test_app
        .import_csv(&token, "Email,Stop Status\nana@test.com,1.0\n", None)
        .await;

    let stop_status: i32 =
        sqlx::query_scalar("SELECT stop_status FROM subscribers WHERE email = 'ana@test.com'")
            .fetch_one(&test_app.db_pool)
            .await
            .expect("Failed to fetch imported subscriber.");

    assert_eq!(stop_status, 1);
}

#[tokio::test]
async fn import_removes_the_uploaded_file() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;

    test_app.import_csv(&token, CONTACTS_CSV, None).await;

    let leftovers = std::fs::read_dir(test_app.upload_dir.path())
        .expect("Failed to read upload dir.")
        .count();

    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn import_returns_400_without_a_file() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;
    let form = reqwest::multipart::Form::new().text("listId", "1");

    let response = test_app
        .api_client
        .post(&format!("{}/api/subscribers/import", test_app.address))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn import_returns_400_for_a_non_numeric_list_id() {
    let test_app = TestApp::spawn_app().await;
    let token = test_app.login().await;
    let form = reqwest::multipart::Form::new()
        .text("listId", "newsletter")
        .part(
            "file",
            reqwest::multipart::Part::bytes(CONTACTS_CSV.as_bytes().to_vec())
                .file_name("contacts.csv"),
        );

    let response = test_app
        .api_client
        .post(&format!("{}/api/subscribers/import", test_app.address))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    assert_eq!(test_app.subscriber_count().await, 0);
}
