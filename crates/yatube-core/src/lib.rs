//! # Yatube Core
//!
//! The domain layer of the Yatube blog.
//! This crate contains entities, pagination rules and the ports that
//! infrastructure must implement. It has no infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod ports;

pub use error::{DomainError, RepoError};
