//! # User Service Library
//!
//! This library provides the core functionality for the multi-tenant user
//! service: validation, the identity/membership store, the association
//! service and the HTTP layer on top of it.

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod server;
pub mod service;
pub mod telemetry;
pub mod tenancy;
pub mod validation;
pub use migration;
