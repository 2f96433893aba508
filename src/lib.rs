pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod navigation;
pub mod session;
pub mod storage;
pub mod users;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthClient, TokenCheck, User};
pub use guard::{GuardDecision, RouteData, RouteGuard};
pub use http::ApiClient;
pub use navigation::{Navigation, Navigator};
pub use session::{Session, SessionState};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageEvent, TokenStore};
pub use users::UserService;

const STORAGE_EVENT_CAPACITY: usize = 16;

/// Every collaborator of the client, wired once per process.
#[derive(Clone)]
pub struct SessionContext {
    pub config: Arc<Settings>,
    pub session: Arc<SessionState>,
    pub auth: AuthClient,
    pub api: ApiClient,
    pub users: UserService,
    pub guard: RouteGuard,
    pub navigator: Navigator,
    storage_events: broadcast::Sender<StorageEvent>,
}

impl SessionContext {
    /// Builds the context on the storage backend the settings select.
    pub fn new(config: Settings) -> Result<Self> {
        let backend: Arc<dyn KeyValueStore> = if config.uses_memory_storage() {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(FileStore::new(&config.storage.path))
        };
        Self::with_store(config, backend)
    }

    pub fn with_store(config: Settings, backend: Arc<dyn KeyValueStore>) -> Result<Self> {
        let refresh_threshold = config.auth.refresh_threshold()?;
        let transport = http::HttpTransport::new(&config.api.base_url, config.logging.log_bodies)?;
        let tokens = TokenStore::new(backend);
        let session = Arc::new(SessionState::new());
        let navigator = Navigator::new();

        let auth = AuthClient::new(
            transport.clone(),
            tokens.clone(),
            session.clone(),
            navigator.clone(),
            refresh_threshold,
        );
        auth.restore();

        let api = ApiClient::new(transport, tokens, auth.refresh_coordinator());
        let users = UserService::new(api.clone());
        let guard = RouteGuard::new(auth.clone());

        let (storage_events, receiver) = broadcast::channel(STORAGE_EVENT_CAPACITY);
        users.watch_storage_events(receiver);

        info!("Session context ready against {}", config.api.base_url);

        Ok(Self {
            config: Arc::new(config),
            session,
            auth,
            api,
            users,
            guard,
            navigator,
            storage_events,
        })
    }

    /// Forwards a change made to shared storage by another client.
    pub fn notify_storage_change(&self, event: StorageEvent) {
        // No watcher task when built outside a runtime.
        if let Err(broadcast::error::SendError(event)) = self.storage_events.send(event) {
            self.users.handle_storage_event(&event);
        }
    }
}
