//! Rocha Brindes Admin library.
//!
//! This crate provides the back-office as a library, allowing it to be
//! tested and reused.
//!
//! # Security
//!
//! Every write is authorized by the signed-in operator's Firebase ID token;
//! the server holds no service credentials of its own. Screens live under a
//! configurable base path (`ADMIN_BASE_PATH`) and require a session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
