pub mod app;
pub mod call;
pub mod config;
pub mod error;
pub mod handler;
pub mod models;
pub mod store;
pub mod texts;
