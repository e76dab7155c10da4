//! Extractors and error rendering shared by all handlers.

pub mod auth;
pub mod error;
