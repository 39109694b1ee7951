//! Core translation engine module

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod limiter;
pub mod models;
