//! # Flex Reviews Common Library
//!
//! Shared code for the review ingestion services including:
//! - Canonical review, listing and approval models
//! - Configuration loading
//! - Error types
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
