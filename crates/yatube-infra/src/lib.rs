//! # Yatube Infrastructure
//!
//! Concrete implementations of the ports defined in `yatube-core`.
//! This crate contains database, cache, session and media storage integrations.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external services, in-memory only
//! - `postgres` - PostgreSQL repositories and migrations via SeaORM
//! - `redis` - Redis page cache

pub mod auth;
pub mod cache;
#[cfg(feature = "postgres")]
pub mod database;
pub mod memory;
pub mod storage;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use memory::InMemoryDatabase;

pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
pub use storage::LocalMediaStorage;

// Re-exports - PostgreSQL
#[cfg(feature = "postgres")]
pub use database::{DatabaseConfig, migrations::Migrator};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
