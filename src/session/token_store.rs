//! Durable storage for the bearer credential.
//!
//! The backend hands out one opaque token per login; the client persists it
//! under a single key so a restarted process can restore its session. This
//! is the desktop analogue of the browser's `localStorage` token slot.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

/// Boxed future type for token store operations.
pub type TokenFuture<'a, T> = Pin<Box<dyn Future<Output = TokenResult<T>> + Send + 'a>>;

/// Error type for token persistence operations.
#[derive(Debug)]
pub struct TokenStoreError(pub String);

impl std::fmt::Display for TokenStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TokenStoreError {}

impl From<tokio_rusqlite::Error> for TokenStoreError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        Self(err.to_string())
    }
}

/// Result type for token persistence operations.
pub type TokenResult<T> = Result<T, TokenStoreError>;

/// Durable slot holding at most one bearer token.
pub trait TokenStore: Send + Sync {
    /// Load the persisted token, if any.
    fn load(&self) -> TokenFuture<'_, Option<String>>;

    /// Persist the token, replacing any previous value.
    fn save(&self, token: &str) -> TokenFuture<'_, ()>;

    /// Remove the persisted token.
    fn clear(&self) -> TokenFuture<'_, ()>;
}

/// SQLite implementation of the token slot.
pub struct SqliteTokenStore {
    conn: Arc<Connection>,
    table: String,
}

impl SqliteTokenStore {
    /// Table name for persisted credentials.
    pub const DEFAULT_TABLE: &'static str = "credentials";

    /// Key under which the bearer token is stored.
    const TOKEN_KEY: &'static str = "token";

    /// Initialize the store and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if database operations fail.
    pub async fn new(conn: Arc<Connection>) -> TokenResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }

    /// Open (or create) a database file and initialize the store on it.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: impl AsRef<Path>) -> TokenResult<Self> {
        let conn = Connection::open(path.as_ref().to_path_buf()).await?;
        Self::new(Arc::new(conn)).await
    }
}

impl TokenStore for SqliteTokenStore {
    fn load(&self) -> TokenFuture<'_, Option<String>> {
        Box::pin(async move {
            let table = self.table.clone();
            let token = self
                .conn
                .call(move |conn| {
                    let token = conn
                        .query_row(
                            &format!("SELECT value FROM {table} WHERE key = ?1"),
                            [Self::TOKEN_KEY],
                            |row| row.get::<_, String>(0),
                        )
                        .optional()?;
                    Ok(token)
                })
                .await?;
            Ok(token)
        })
    }

    fn save(&self, token: &str) -> TokenFuture<'_, ()> {
        let token = token.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table} (key, value) VALUES (?1, ?2)
                             ON CONFLICT(key) DO UPDATE SET value = excluded.value"
                        ),
                        rusqlite::params![Self::TOKEN_KEY, token],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn clear(&self) -> TokenFuture<'_, ()> {
        Box::pin(async move {
            let table = self.table.clone();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!("DELETE FROM {table} WHERE key = ?1"),
                        [Self::TOKEN_KEY],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}

/// In-memory token slot for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a slot pre-populated with a token.
    #[must_use]
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> TokenFuture<'_, Option<String>> {
        let token = self.token.lock().ok().and_then(|guard| guard.clone());
        Box::pin(async move { Ok(token) })
    }

    fn save(&self, token: &str) -> TokenFuture<'_, ()> {
        if let Ok(mut guard) = self.token.lock() {
            *guard = Some(token.to_string());
        }
        Box::pin(async move { Ok(()) })
    }

    fn clear(&self) -> TokenFuture<'_, ()> {
        if let Ok(mut guard) = self.token.lock() {
            *guard = None;
        }
        Box::pin(async move { Ok(()) })
    }
}
