// Library exports for the server binary and tests
pub mod app;
pub mod auth;
pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod platform;
