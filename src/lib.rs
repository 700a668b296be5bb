pub mod auth;
pub mod chat;
pub mod cli;
pub mod config;
pub mod core;
pub mod models;
pub mod providers;
pub mod server;
pub mod store;
pub mod tools;
pub mod utils;
