pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
