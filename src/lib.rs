// src/lib.rs

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod envelope;
pub mod fileid;
pub mod store;
pub mod validate;
