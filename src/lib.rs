//! Servius - a minimal HTTP/1.1 server engine
//!
//! Core library for the HTTP engine, its configuration, and the Agilefant
//! Times API served on top of it.

pub mod agilefant;
pub mod app;
pub mod config;
pub mod http;
pub mod server;
