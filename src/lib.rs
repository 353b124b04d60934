//! storyreel library crate.
//!
//! Exposes the core modules for integration testing.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod pipeline;
pub mod services;

pub use error::{Error, Result};
