//! Application state - shared across all handlers.

use std::path::PathBuf;
use std::sync::Arc;

use yatube_core::ports::{
    Cache, CommentRepository, FollowRepository, GroupRepository, MediaStorage, PasswordService,
    PostRepository, TokenService, UserRepository,
};
use yatube_infra::{
    Argon2PasswordService, InMemoryCache, InMemoryDatabase, JwtConfig, JwtTokenService,
    LocalMediaStorage,
};

use crate::config::{AppConfig, SiteSettings};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
    pub cache: Arc<dyn Cache>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub media: Arc<dyn MediaStorage>,
    pub settings: SiteSettings,
}

/// The five repositories, built from one backend.
struct Repositories {
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl Repositories {
    fn in_memory(db: &InMemoryDatabase) -> Self {
        Self {
            users: Arc::new(db.users()),
            groups: Arc::new(db.groups()),
            posts: Arc::new(db.posts()),
            comments: Arc::new(db.comments()),
            follows: Arc::new(db.follows()),
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(conn: yatube_infra::database::DbConn) -> Self {
        use yatube_infra::database::{
            PostgresCommentRepository, PostgresFollowRepository, PostgresGroupRepository,
            PostgresPostRepository, PostgresUserRepository,
        };

        Self {
            users: Arc::new(PostgresUserRepository::new(conn.clone())),
            groups: Arc::new(PostgresGroupRepository::new(conn.clone())),
            posts: Arc::new(PostgresPostRepository::new(conn.clone())),
            comments: Arc::new(PostgresCommentRepository::new(conn.clone())),
            follows: Arc::new(PostgresFollowRepository::new(conn)),
        }
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let repositories = Self::init_repositories(config).await;
        let cache = Self::init_cache(config).await;

        tracing::info!(media_root = %config.media_root.display(), "Application state initialized");

        Self::assemble(
            repositories,
            cache,
            Arc::new(JwtTokenService::new(JwtConfig::from_env())),
            config.media_root.clone(),
            config.site.clone(),
        )
    }

    /// State backed entirely by in-memory adapters.
    pub fn in_memory(
        db: &InMemoryDatabase,
        tokens: Arc<dyn TokenService>,
        media_root: PathBuf,
        settings: SiteSettings,
    ) -> Self {
        Self::assemble(
            Repositories::in_memory(db),
            Arc::new(InMemoryCache::new()),
            tokens,
            media_root,
            settings,
        )
    }

    fn assemble(
        repositories: Repositories,
        cache: Arc<dyn Cache>,
        tokens: Arc<dyn TokenService>,
        media_root: PathBuf,
        settings: SiteSettings,
    ) -> Self {
        Self {
            users: repositories.users,
            groups: repositories.groups,
            posts: repositories.posts,
            comments: repositories.comments,
            follows: repositories.follows,
            cache,
            tokens,
            passwords: Arc::new(Argon2PasswordService::new()),
            media: Arc::new(LocalMediaStorage::new(media_root)),
            settings,
        }
    }

    #[cfg(feature = "postgres")]
    async fn init_repositories(config: &AppConfig) -> Repositories {
        let Some(db_config) = config.database.as_ref() else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Repositories::in_memory(&InMemoryDatabase::new());
        };

        match yatube_infra::database::connect(db_config).await {
            Ok(conn) => Repositories::postgres(conn),
            Err(e) => {
                tracing::error!(
                    "Failed to connect to database: {}. Using in-memory fallback.",
                    e
                );
                Repositories::in_memory(&InMemoryDatabase::new())
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn init_repositories(_config: &AppConfig) -> Repositories {
        tracing::info!("Running without postgres feature - using in-memory repositories");
        Repositories::in_memory(&InMemoryDatabase::new())
    }

    #[cfg(feature = "redis")]
    async fn init_cache(config: &AppConfig) -> Arc<dyn Cache> {
        if !config.redis_enabled {
            return Arc::new(InMemoryCache::new());
        }

        match yatube_infra::RedisCache::from_env().await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable. Using in-memory page cache.");
                Arc::new(InMemoryCache::new())
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn init_cache(config: &AppConfig) -> Arc<dyn Cache> {
        if config.redis_enabled {
            tracing::warn!("REDIS_URL is set but the redis feature is disabled");
        }
        Arc::new(InMemoryCache::new())
    }
}
