//! services/client/src/lib.rs
//!
//! The personal health-record client: REST and storage adapters, the view
//! controllers built on the core ports, and configuration.

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
