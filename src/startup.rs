use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::auth::{AdminAccount, JwtService, PasswordService};
use crate::config::{DatabaseSettings, Settings};
use crate::import::PgSubscriberStore;
use crate::phone_verification::PhoneVerificationClient;
use crate::routes::{
    handle_add_subscriber, handle_change_password, handle_create_list, handle_delete_list,
    handle_get_lists, handle_import_subscribers, handle_list_subscribers, handle_login,
    handle_logout, handle_me, health_check,
};

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let db_pool = get_connection_db_pool(&config.database);
        let phone_verifier = PhoneVerificationClient::new(
            config.phone_verification.base_url.clone(),
            config.phone_verification.api_key.clone(),
            config.phone_verification.bot_score_threshold,
            Some(config.phone_verification.get_timeout()),
        )
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

        if config.phone_verification.api_key.is_none() {
            tracing::warn!("Phone verification API key not configured, submissions are not verified");
        }

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, db_pool, phone_verifier, &config)?;

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    phone_verifier: PhoneVerificationClient,
    config: &Settings,
) -> Result<Server, std::io::Error> {
    let passwords = PasswordService::new()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", err)))?;

    let store = web::Data::new(PgSubscriberStore::new(db_pool.clone()));
    let db_pool = web::Data::new(db_pool);
    let phone_verifier = web::Data::new(phone_verifier);
    let import_config = web::Data::new(config.import.clone());
    let jwt = web::Data::new(JwtService::from_settings(&config.auth));
    let admin_account = web::Data::new(AdminAccount::from_settings(&config.auth.admin));
    let passwords = web::Data::new(passwords);
    let json_config = web::JsonConfig::default().limit(config.application.max_body_bytes);
    let request_timeout = config.get_request_timeout();

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .service(
                        web::scope("/auth")
                            .route("/login", web::post().to(handle_login))
                            .route("/logout", web::post().to(handle_logout))
                            .route("/me", web::get().to(handle_me))
                            .route("/change-password", web::post().to(handle_change_password)),
                    )
                    .service(
                        web::scope("/lists")
                            .route("", web::post().to(handle_create_list))
                            .route("", web::get().to(handle_get_lists))
                            .route("/{id}", web::delete().to(handle_delete_list)),
                    )
                    .service(
                        web::scope("/subscribers")
                            .route("", web::post().to(handle_add_subscriber))
                            .route("", web::get().to(handle_list_subscribers))
                            .route("/import", web::post().to(handle_import_subscribers)),
                    ),
            )
            .app_data(json_config.clone())
            .app_data(db_pool.clone())
            .app_data(store.clone())
            .app_data(phone_verifier.clone())
            .app_data(import_config.clone())
            .app_data(jwt.clone())
            .app_data(admin_account.clone())
            .app_data(passwords.clone())
    })
    // Imports of large files run for minutes
    .client_request_timeout(request_timeout)
    .client_disconnect_timeout(request_timeout)
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}
