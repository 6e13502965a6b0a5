pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;
