pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod kind;
pub mod models;
pub mod notify;
pub mod render;
pub mod repository;
pub mod routes;
pub mod schema;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod templates;
pub mod utils;
pub mod validation;
