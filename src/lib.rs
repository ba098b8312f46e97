pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gates;
pub mod handlers;
pub mod middleware;
pub mod navigation;
pub mod platform;
pub mod profile;
pub mod routes;
pub mod server;
pub mod session;

#[cfg(test)]
pub mod testing;
