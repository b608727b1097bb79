pub mod admin;
pub mod app;
pub mod auth;
pub mod chirps;
pub mod config;
pub mod error;
pub mod polka;
pub mod state;
pub mod store;
