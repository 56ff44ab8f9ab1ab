pub mod config;
pub mod jwt_auth;
pub mod realtime;
mod responses;
mod telemetry;
pub mod upload_signer;

pub use self::config::AppConfig;
pub use responses::*;
pub use telemetry::*;
