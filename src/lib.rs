//! Crowd-sourced trawler sighting reports

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod models;
pub mod templates;
