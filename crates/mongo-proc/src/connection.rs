//! MongoDB connection management with pool configuration and health checking

use bson::{doc, Document as BsonDocument};
use mongo_proc_common::{MongoProcError, Result};
use mongodb::{
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection, Database,
};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Connection string used when the caller does not supply one
pub const DEFAULT_DSN: &str = "mongodb://localhost:27017/";

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections in the pool (default: driver default)
    pub min_pool_size: Option<u32>,
    /// Maximum number of connections in the pool (default: 10)
    pub max_pool_size: Option<u32>,
    /// Maximum time a connection can remain idle before being closed (default: none)
    pub max_idle_time: Option<Duration>,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Option<Duration>,
    /// Server selection timeout (default: 30s)
    pub server_selection_timeout: Option<Duration>,
    /// Application name for server logs
    pub app_name: Option<String>,
    /// Declare Stable API v1 to the server
    pub stable_api: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pool_size: None,
            max_pool_size: Some(10),
            max_idle_time: None,
            connect_timeout: Some(Duration::from_secs(10)),
            server_selection_timeout: Some(Duration::from_secs(30)),
            app_name: Some("mongo-proc".to_string()),
            stable_api: true,
        }
    }
}

impl PoolConfig {
    fn apply(self, client_options: &mut ClientOptions) {
        if let Some(min) = self.min_pool_size {
            client_options.min_pool_size = Some(min);
        }
        if let Some(max) = self.max_pool_size {
            client_options.max_pool_size = Some(max);
        }
        if let Some(idle) = self.max_idle_time {
            client_options.max_idle_time = Some(idle);
        }
        if let Some(connect) = self.connect_timeout {
            client_options.connect_timeout = Some(connect);
        }
        if let Some(server_sel) = self.server_selection_timeout {
            client_options.server_selection_timeout = Some(server_sel);
        }
        if let Some(app) = self.app_name {
            client_options.app_name = Some(app);
        }
        if self.stable_api {
            let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
            client_options.server_api = Some(server_api);
        }
    }
}

/// A driver client bound to one database
///
/// Every facade operation takes a `&Connection`. Collections are derived
/// on demand and never cached.
#[derive(Debug, Clone)]
pub struct Connection {
    client: Client,
    database: Database,
    database_name: String,
}

impl Connection {
    /// Connect with default pool settings and select `database`
    ///
    /// A `None` connection string falls back to [`DEFAULT_DSN`]; any string
    /// given, including an empty one, is parsed as is.
    pub async fn init(connection_string: Option<&str>, database: &str) -> Result<Self> {
        Self::with_config(connection_string, database, PoolConfig::default()).await
    }

    /// Connect with a custom pool configuration and select `database`
    pub async fn with_config(
        connection_string: Option<&str>,
        database: &str,
        config: PoolConfig,
    ) -> Result<Self> {
        if database.is_empty() {
            return Err(MongoProcError::Config(
                "A database name is required".to_string(),
            ));
        }

        let dsn = connection_string.unwrap_or(DEFAULT_DSN);

        let mut client_options = ClientOptions::parse(dsn).await?;
        config.apply(&mut client_options);

        let client = Client::with_options(client_options)?;
        let database_handle = client.database(database);

        tracing::info!(database = database, "MongoDB client created");

        Ok(Self {
            client,
            database: database_handle,
            database_name: database.to_string(),
        })
    }

    /// Get a reference to the database
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Get the database name
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Get a reference to the client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get a collection by name
    pub fn collection(&self, name: &str) -> Collection<BsonDocument> {
        self.database.collection(name)
    }

    /// Check the server is reachable
    pub async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    /// Shut down the driver client, closing its pooled connections
    pub async fn close(self) -> Result<()> {
        tracing::info!(database = %self.database_name, "Closing MongoDB client");
        self.client.shutdown().await;
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> MongoProcError {
    MongoProcError::Internal(format!("Connection lock poisoned: {}", e))
}

enum SlotState {
    Uninitialized,
    Open(Arc<Connection>),
    Closed,
}

/// Caller-owned holder for a shared [`Connection`]
///
/// Lifecycle is `uninitialized -> initialized -> closed`. [`get`](Self::get)
/// hands out an `Arc` and releases the lock immediately, so I/O never runs
/// under the lock.
///
/// Re-initializing replaces the connection without waiting for in-flight
/// operations; those keep the `Arc` they already hold. Callers that need
/// stronger guarantees must serialize `init` themselves.
pub struct ConnectionSlot {
    state: RwLock<SlotState>,
}

impl Default for ConnectionSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSlot {
    /// Create an empty slot (usable in a `static`)
    pub const fn new() -> Self {
        Self {
            state: RwLock::new(SlotState::Uninitialized),
        }
    }

    /// Connect and install the connection, replacing any current one
    pub async fn init(&self, connection_string: Option<&str>, database: &str) -> Result<()> {
        let conn = Connection::init(connection_string, database).await?;
        self.install(conn)?;
        Ok(())
    }

    /// Install an already established connection
    ///
    /// Returns the connection that was replaced, if any.
    pub fn install(&self, conn: Connection) -> Result<Option<Arc<Connection>>> {
        let mut state = self.state.write().map_err(poisoned)?;

        let previous = match std::mem::replace(&mut *state, SlotState::Open(Arc::new(conn))) {
            SlotState::Open(prev) => {
                tracing::warn!(
                    database = %prev.database_name(),
                    "Replacing an active connection; in-flight operations keep the old one"
                );
                Some(prev)
            }
            SlotState::Uninitialized | SlotState::Closed => None,
        };

        Ok(previous)
    }

    /// Get the current connection
    pub fn get(&self) -> Result<Arc<Connection>> {
        let state = self.state.read().map_err(poisoned)?;

        match &*state {
            SlotState::Open(conn) => Ok(Arc::clone(conn)),
            SlotState::Uninitialized => Err(MongoProcError::Config(
                "MongoDB not initialized. Call init() first.".to_string(),
            )),
            SlotState::Closed => Err(MongoProcError::Config(
                "MongoDB connection is closed. Call init() to reconnect.".to_string(),
            )),
        }
    }

    /// Whether a connection is currently installed
    pub fn is_initialized(&self) -> Result<bool> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(matches!(*state, SlotState::Open(_)))
    }

    /// Close the current connection
    ///
    /// The driver client is shut down only if no other handle is still
    /// holding it; otherwise it is released when the last `Arc` drops.
    pub async fn close(&self) -> Result<()> {
        let taken = {
            let mut state = self.state.write().map_err(poisoned)?;

            match std::mem::replace(&mut *state, SlotState::Closed) {
                SlotState::Open(conn) => conn,
                other => {
                    *state = other;
                    return Err(MongoProcError::Config(
                        "No active connection to close".to_string(),
                    ));
                }
            }
        };

        match Arc::try_unwrap(taken) {
            Ok(conn) => conn.close().await,
            Err(shared) => {
                tracing::debug!(
                    database = %shared.database_name(),
                    "Connection still referenced; released when the last handle drops"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_config() {
        let config = PoolConfig::default();
        assert_eq!(config.max_pool_size, Some(10));
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.app_name, Some("mongo-proc".to_string()));
        assert!(config.stable_api);
    }

    #[test]
    fn test_pool_config_applies_to_client_options() {
        let config = PoolConfig {
            min_pool_size: Some(2),
            max_pool_size: Some(50),
            max_idle_time: Some(Duration::from_secs(300)),
            connect_timeout: Some(Duration::from_secs(5)),
            server_selection_timeout: Some(Duration::from_secs(10)),
            app_name: Some("my-app".to_string()),
            stable_api: false,
        };

        let mut options = ClientOptions::default();
        config.apply(&mut options);

        assert_eq!(options.min_pool_size, Some(2));
        assert_eq!(options.max_pool_size, Some(50));
        assert_eq!(options.max_idle_time, Some(Duration::from_secs(300)));
        assert_eq!(options.app_name.as_deref(), Some("my-app"));
        assert!(options.server_api.is_none());
    }

    #[tokio::test]
    async fn test_init_requires_database_name() {
        let err = Connection::init(None, "").await.unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_init_passes_through_driver_errors() {
        let err = Connection::init(Some("not-a-mongodb-uri"), "mydb")
            .await
            .unwrap_err();
        assert!(!err.is_config_error());
        assert!(err.driver_error().is_some());
    }

    #[tokio::test]
    async fn test_init_parses_empty_dsn_as_given() {
        let err = Connection::init(Some(""), "mydb").await.unwrap_err();
        assert!(!err.is_config_error());
        assert!(err.driver_error().is_some());
    }

    #[tokio::test]
    async fn test_init_does_not_contact_server() {
        // Client construction is lazy; nothing listens on this port.
        let conn = Connection::init(Some("mongodb://127.0.0.1:1/"), "mydb")
            .await
            .unwrap();
        assert_eq!(conn.database_name(), "mydb");
        assert_eq!(conn.collection("projects").name(), "projects");
    }

    #[test]
    fn test_slot_uninitialized_is_config_error() {
        let slot = ConnectionSlot::new();
        assert!(!slot.is_initialized().unwrap());
        let err = slot.get().unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_poisoned_slot_is_internal_error() {
        let slot = ConnectionSlot::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = slot.state.write().unwrap();
            panic!("writer panicked");
        }));

        assert!(matches!(slot.is_initialized(), Err(MongoProcError::Internal(_))));
        assert!(matches!(slot.get(), Err(MongoProcError::Internal(_))));
        let conn = Connection::init(Some("mongodb://127.0.0.1:1/"), "mydb")
            .await
            .unwrap();
        assert!(matches!(slot.install(conn), Err(MongoProcError::Internal(_))));
    }

    #[test]
    fn test_slot_close_without_connection() {
        let slot = ConnectionSlot::new();
        let err = tokio_test::block_on(slot.close()).unwrap_err();
        assert!(err.is_config_error());
        // Still uninitialized, not closed
        assert!(slot.get().unwrap_err().to_string().contains("not initialized"));
    }

    #[tokio::test]
    async fn test_slot_lifecycle() {
        let slot = ConnectionSlot::new();

        let first = Connection::init(Some("mongodb://127.0.0.1:1/"), "db1")
            .await
            .unwrap();
        assert!(slot.install(first).unwrap().is_none());
        assert!(slot.is_initialized().unwrap());
        assert_eq!(slot.get().unwrap().database_name(), "db1");

        let second = Connection::init(Some("mongodb://127.0.0.1:1/"), "db2")
            .await
            .unwrap();
        let held = slot.get().unwrap();
        let replaced = slot.install(second).unwrap().expect("previous connection");
        assert_eq!(replaced.database_name(), "db1");
        // Handles taken before re-init keep the old connection
        assert_eq!(held.database_name(), "db1");
        assert_eq!(slot.get().unwrap().database_name(), "db2");

        slot.close().await.unwrap();
        assert!(!slot.is_initialized().unwrap());
        let err = slot.get().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("closed"));
    }
}
