//! Application state wiring all services together.
//!
//! The chat service is generic over repository traits; AppState pins it to
//! the concrete SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;

use chatline_core::chat::service::ChatSessionService;
use chatline_core::llm::registry::ModelRegistry;
use chatline_infra::config::{database_url, load_app_config, resolve_data_dir};
use chatline_infra::llm::build_model_registry;
use chatline_infra::sqlite::chat::SqliteChatRepository;
use chatline_infra::sqlite::document::SqliteDocumentRepository;
use chatline_infra::sqlite::message::SqliteMessageRepository;
use chatline_infra::sqlite::pool::DatabasePool;
use chatline_infra::sqlite::stream::SqliteStreamRepository;
use chatline_infra::sqlite::user::SqliteUserRepository;
use chatline_types::config::AppConfig;

/// Concrete type alias for the chat service pinned to infra implementations.
pub type ConcreteChatService = ChatSessionService<
    SqliteChatRepository,
    SqliteMessageRepository,
    SqliteStreamRepository,
    SqliteDocumentRepository,
>;

/// Shared application state, used by both CLI commands and REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub user_repo: Arc<SqliteUserRepository>,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, build
    /// the model registry, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_app_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir)).await?;
        let registry = build_model_registry(&config);

        Ok(Self::with_registry(db_pool, config, registry, data_dir))
    }

    /// Wire services over an open pool and a prepared model registry.
    pub fn with_registry(
        db_pool: DatabasePool,
        config: AppConfig,
        registry: ModelRegistry,
        data_dir: PathBuf,
    ) -> Self {
        let chat_service = ChatSessionService::new(
            Arc::new(SqliteChatRepository::new(db_pool.clone())),
            Arc::new(SqliteMessageRepository::new(db_pool.clone())),
            Arc::new(SqliteStreamRepository::new(db_pool.clone())),
            Arc::new(SqliteDocumentRepository::new(db_pool.clone())),
            Arc::new(registry),
            &config,
        );

        Self {
            chat_service: Arc::new(chat_service),
            user_repo: Arc::new(SqliteUserRepository::new(db_pool.clone())),
            config: Arc::new(config),
            data_dir,
            db_pool,
        }
    }

    /// Wait for in-flight generations to commit, then close the database.
    pub async fn shutdown(&self) {
        self.chat_service.shutdown().await;
        self.db_pool.close().await;
    }
}
