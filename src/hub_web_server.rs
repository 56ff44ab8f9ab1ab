use crate::core::jwt_auth::JwtKeys;
use crate::core::realtime::EventHub;
use crate::core::upload_signer::UploadSigner;
use crate::core::{AppConfig, AppError};
use crate::routes::hub_routes;
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{dev::Server, web, web::Data, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

pub struct HubWebServer {
    port: u16,
    server: Server,
}

impl HubWebServer {
    pub async fn build(configuration: AppConfig) -> Result<Self, anyhow::Error> {
        let address = format!(
            "{}:{}",
            configuration.hub_server_config.host, configuration.hub_server_config.port
        );

        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(5))
            .connect_lazy_with(configuration.postgres.connect());

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");

        let keys = JwtKeys::new(
            configuration.jwt_auth_config.secret.clone(),
            configuration.jwt_auth_config.token_expiration_time,
        );
        let signer = UploadSigner::from_config(&configuration.uploads);

        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let server = run(listener, pool, keys, EventHub::new(), signer)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    pool: PgPool,
    keys: JwtKeys,
    hub: EventHub,
    signer: UploadSigner,
) -> Result<Server, anyhow::Error> {
    let pool = Data::new(pool);
    let keys = Data::new(keys);
    let hub = Data::new(hub);
    let signer = Data::new(signer);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allowed_headers(vec![
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
            ])
            .supports_credentials();

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .configure(hub_routes)
            .app_data(json_config())
            .app_data(query_config())
            .app_data(pool.clone())
            .app_data(keys.clone())
            .app_data(hub.clone())
            .app_data(signer.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

/// Malformed bodies get the same envelope as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _| AppError::validation_error(format!("Invalid body: {err}")).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _| AppError::validation_error(format!("Invalid query: {err}")).into())
}
