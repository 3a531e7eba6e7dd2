//! # Accounts & Viewing History
//!
//! Local SQLite storage behind the auth and history endpoints.
//!
//! - Users: username + Argon2id password hash (PHC string, salt embedded)
//! - Sessions: opaque UUID v4 bearer tokens, valid for [`SESSION_TTL_DAYS`]
//! - History: append-only, one row per opened video, read back oldest first

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{HistoryEntry, NewHistoryEntry};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_USERNAME_LEN: usize = 64;
pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid or expired session")]
    InvalidSession,
    #[error("Password hashing failed: {0}")]
    PasswordHash(argon2::password_hash::Error),
    #[error("{0}")]
    InvalidInput(String),
}

// ============================================================================
// DATA TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

// ============================================================================
// SCHEMA
// ============================================================================

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sessions (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    video_id TEXT NOT NULL,
    title TEXT NOT NULL,
    watched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_user ON history(user_id, id);
"#;

// ============================================================================
// STORE
// ============================================================================

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        info!("Opened history database at {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("GeoTube")
            .join("geotube.db")
    }

    // ========================================================================
    // USERS & SESSIONS
    // ========================================================================

    pub fn register(&self, username: &str, password: &str) -> Result<Session, StoreError> {
        let username = username.trim();
        if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
            return Err(StoreError::InvalidInput(format!(
                "Username must be 1-{} characters",
                MAX_USERNAME_LEN
            )));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(StoreError::InvalidInput(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let conn = self.conn.lock();

        let exists: Option<String> = conn
            .query_row("SELECT id FROM users WHERE username = ?", [username], |row| row.get(0))
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::UsernameTaken);
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        let password_hash = hash_password(password)?;

        conn.execute(
            "INSERT INTO users (id, username, password_hash, created_at) VALUES (?, ?, ?, ?)",
            params![user.id, user.username, password_hash, user.created_at.to_rfc3339()],
        )?;

        debug!("Registered user {}", user.username);
        let token = new_session(&conn, &user.id)?;
        Ok(Session { token, user })
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Session, StoreError> {
        let conn = self.conn.lock();

        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT id, password_hash, created_at FROM users WHERE username = ?",
                [username.trim()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((id, hash, created_at)) = row else {
            return Err(StoreError::InvalidCredentials);
        };
        if !verify_password(password, &hash) {
            return Err(StoreError::InvalidCredentials);
        }

        let purged = conn.execute(
            "DELETE FROM sessions WHERE user_id = ? AND created_at < ?",
            params![id, session_cutoff().to_rfc3339()],
        )?;
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }

        let user = User {
            id,
            username: username.trim().to_string(),
            created_at: parse_timestamp(&created_at)?,
        };
        let token = new_session(&conn, &user.id)?;
        Ok(Session { token, user })
    }

    /// Resolve a bearer token to its user. Tokens older than
    /// [`SESSION_TTL_DAYS`] are deleted and rejected.
    pub fn authenticate(&self, token: &str) -> Result<User, StoreError> {
        let conn = self.conn.lock();

        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT u.id, u.username, u.created_at, s.created_at FROM sessions s
                 JOIN users u ON u.id = s.user_id WHERE s.token = ?",
                [token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let (id, username, created_at, issued_at) = row.ok_or(StoreError::InvalidSession)?;
        if parse_timestamp(&issued_at)? < session_cutoff() {
            conn.execute("DELETE FROM sessions WHERE token = ?", [token])?;
            return Err(StoreError::InvalidSession);
        }
        Ok(User {
            id,
            username,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    pub fn append_history(
        &self,
        user_id: &str,
        entry: &NewHistoryEntry,
    ) -> Result<HistoryEntry, StoreError> {
        if entry.video_id.trim().is_empty() {
            return Err(StoreError::InvalidInput("videoId is required".into()));
        }

        let recorded = HistoryEntry {
            video_id: entry.video_id.trim().to_string(),
            title: entry.title.clone(),
            timestamp: Utc::now(),
        };

        self.conn.lock().execute(
            "INSERT INTO history (user_id, video_id, title, watched_at) VALUES (?, ?, ?, ?)",
            params![user_id, recorded.video_id, recorded.title, recorded.timestamp.to_rfc3339()],
        )?;

        Ok(recorded)
    }

    /// Full history for a user, oldest first.
    pub fn history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT video_id, title, watched_at FROM history WHERE user_id = ? ORDER BY id ASC",
        )?;

        let rows = stmt.query_map([user_id], |row| {
            let watched_at: String = row.get(2)?;
            let timestamp = DateTime::parse_from_rfc3339(&watched_at)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
                })?
                .with_timezone(&Utc);

            Ok(HistoryEntry {
                video_id: row.get(0)?,
                title: row.get(1)?,
                timestamp,
            })
        })?;

        let history = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(history)
    }
}

fn new_session(conn: &Connection, user_id: &str) -> Result<String, StoreError> {
    let token = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)",
        params![token, user_id, Utc::now().to_rfc3339()],
    )?;
    Ok(token)
}

fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(StoreError::PasswordHash)
}

/// Constant-time check against a stored PHC string. An unparseable hash never matches.
fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}

fn session_cutoff() -> DateTime<Utc> {
    Utc::now() - Duration::days(SESSION_TTL_DAYS)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::Sqlite(rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            ))
        })
}
