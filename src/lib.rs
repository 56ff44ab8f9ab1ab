pub mod core;
pub mod db;
pub mod hub_web_server;
pub mod models;
pub mod routes;
