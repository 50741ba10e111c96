pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod ocr;
pub mod routes;
pub mod services;
pub mod terminal;
