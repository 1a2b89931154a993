use reqwest::Response;
use secrecy::Secret;
use sqlx::{migrate, Connection, Executor, PgConnection, PgPool};
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::MockServer;

use list_manager::{
    auth::PasswordService,
    config::{get_configuration, DatabaseSettings, Settings},
    startup::{get_connection_db_pool, Application},
};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub db_pool: PgPool,
    pub phone_server: MockServer,
    pub upload_dir: TempDir,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let db_test_name = format!("db_{}", Uuid::new_v4().to_string().replace('-', "_"));
        let phone_server = MockServer::start().await;
        let upload_dir = TempDir::new().expect("Failed to create upload dir.");
        let passwords = PasswordService::new().expect("Failed to build password service.");

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.set_phone_verification_base_url(phone_server.uri());
        config.set_phone_verification_api_key(Some(Secret::new(String::from("test-api-key"))));
        config.set_upload_dir(upload_dir.path().to_path_buf());
        config.auth.admin.username = String::from(ADMIN_USERNAME);
        config.auth.admin.password_hash = Secret::new(
            passwords
                .hash_password(ADMIN_PASSWORD)
                .expect("Failed to hash admin password."),
        );

        let db_pool = configure_db(&mut config.database, db_test_name.clone()).await;

        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            config,
            db_pool,
            phone_server,
            upload_dir,
            api_client: reqwest::Client::new(),
        }
    }

    pub async fn post_subscriber(&self, body: serde_json::Value) -> Response {
        self.api_client
            .post(&format!("{}/api/subscribers", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_subscribers(&self, token: &str, list_id: Option<i64>) -> Response {
        let mut request = self
            .api_client
            .get(&format!("{}/api/subscribers", self.address))
            .bearer_auth(token);

        if let Some(list_id) = list_id {
            request = request.query(&[("listId", list_id)]);
        }

        request.send().await.expect("Failed to execute request.")
    }

    pub async fn post_login(&self, body: serde_json::Value) -> Response {
        self.api_client
            .post(&format!("{}/api/auth/login", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Logs in as the test admin and returns the bearer token.
    pub async fn login(&self) -> String {
        let response = self
            .post_login(serde_json::json!({
                "username": ADMIN_USERNAME,
                "password": ADMIN_PASSWORD
            }))
            .await;
        let body: serde_json::Value = response.json().await.expect("Invalid login response.");

        body["token"]
            .as_str()
            .expect("Login response without token.")
            .to_string()
    }

    pub async fn post_list(&self, token: &str, body: serde_json::Value) -> Response {
        self.api_client
            .post(&format!("{}/api/lists", self.address))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Creates a list and returns its id.
    pub async fn create_list(&self, token: &str, name: &str) -> i64 {
        let response = self
            .post_list(token, serde_json::json!({ "name": name }))
            .await;
        let body: serde_json::Value = response.json().await.expect("Invalid list response.");

        body["id"].as_i64().expect("List response without id.")
    }

    pub async fn import_csv(&self, token: &str, csv: &str, list_id: Option<i64>) -> Response {
        let file = reqwest::multipart::Part::bytes(csv.as_bytes().to_vec())
            .file_name("contacts.csv")
            .mime_str("text/csv")
            .expect("Invalid mime type.");
        let mut form = reqwest::multipart::Form::new().part("file", file);

        if let Some(list_id) = list_id {
            form = form.text("listId", list_id.to_string());
        }

        self.api_client
            .post(&format!("{}/api/subscribers/import", self.address))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn subscriber_count(&self) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subscribers")
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to count subscribers.")
    }

    pub async fn membership_count(&self, list_id: i64) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM list_subscribers WHERE list_id = $1")
            .bind(list_id)
            .fetch_one(&self.db_pool)
            .await
            .expect("Failed to count memberships.")
    }
}

async fn configure_db(db_config: &mut DatabaseSettings, db_test_name: String) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect_with(&db_config.get_server_options())
        .await
        .expect("Failed to connect to Postgres.");

    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, db_test_name))
        .await
        .expect("Failed to create database.");

    connection
        .close()
        .await
        .expect("Failed to close connection.");

    // Execute migrations
    db_config.set_name(db_test_name.clone());

    let db_pool = get_connection_db_pool(db_config);

    migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations.");

    db_pool
}
