pub mod clients;
pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod utils;
