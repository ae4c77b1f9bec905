//! Keygate Library
//!
//! Challenge-response authentication for key holders: a client proves
//! control of a private key by signing a server-issued challenge and receives
//! a time-bounded session in return.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
