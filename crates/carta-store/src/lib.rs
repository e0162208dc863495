use carta_api::{ShoppingItem, UserData};
use carta_core::{CartaError, CartaResult};
use carta_fs::WorkspacePaths;
use chrono::Utc;
use rusqlite::{Connection, Error as SqlError, ErrorCode, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const AUTH_KEY: &str = "auth";
pub const SHOPPING_LIST_KEY: &str = "shopping_list_local_v1";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, rename = "accessToken")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserData>,
}

impl Session {
    pub fn authenticated(user: UserData, access_token: Option<String>) -> Self {
        Self {
            access_token,
            user: Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct KvStore {
    db_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    kv: KvStore,
}

#[derive(Debug, Clone)]
pub struct ShoppingListStore {
    kv: KvStore,
}

#[derive(Debug, Clone)]
pub struct EnvCredentials {
    pub email: String,
    pub password: String,
}

impl KvStore {
    pub fn open(paths: &WorkspacePaths) -> CartaResult<Self> {
        fs::create_dir_all(&paths.carta_dir).map_err(|err| {
            CartaError::io(format!(
                "failed to create workspace directory '{}': {}",
                paths.carta_dir.display(),
                err
            ))
        })?;

        let store = Self {
            db_path: paths.state_db_path.clone(),
        };

        let conn = store.connection()?;
        store.initialize_schema(&conn)?;

        Ok(store)
    }

    pub fn get(&self, key: &str) -> CartaResult<Option<String>> {
        let conn = self.connection()?;
        conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|err| sqlite_error("read value", &self.db_path, err))
    }

    pub fn set(&self, key: &str, value: &str) -> CartaResult<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )
        .map_err(|err| sqlite_error("write value", &self.db_path, err))?;

        Ok(())
    }

    pub fn remove(&self, key: &str) -> CartaResult<()> {
        let conn = self.connection()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|err| sqlite_error("remove value", &self.db_path, err))?;
        Ok(())
    }

    fn connection(&self) -> CartaResult<Connection> {
        Connection::open(&self.db_path)
            .map_err(|err| sqlite_error("open state database", &self.db_path, err))
    }

    fn initialize_schema(&self, conn: &Connection) -> CartaResult<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS kv (
                 key TEXT PRIMARY KEY,
                 value TEXT NOT NULL,
                 updated_at TEXT NOT NULL
             );",
        )
        .map_err(|err| sqlite_error("initialize schema", &self.db_path, err))?;

        Ok(())
    }
}

impl SessionStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub fn load(&self) -> CartaResult<Option<Session>> {
        let Some(payload) = self.kv.get(AUTH_KEY)? else {
            return Ok(None);
        };

        let parsed = serde_json::from_str::<Session>(&payload)
            .map_err(|err| CartaError::io(format!("failed to parse stored session: {err}")))?;

        Ok(Some(parsed))
    }

    pub fn save(&self, session: &Session) -> CartaResult<()> {
        let payload = serde_json::to_string(session)
            .map_err(|err| CartaError::io(format!("failed to serialize session: {err}")))?;
        self.kv.set(AUTH_KEY, &payload)
    }

    pub fn clear(&self) -> CartaResult<()> {
        self.save(&Session::default())
    }
}

impl ShoppingListStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    pub fn read_list(&self) -> Vec<ShoppingItem> {
        match self.kv.get(SHOPPING_LIST_KEY) {
            Ok(Some(payload)) => serde_json::from_str(&payload).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn write_list(&self, items: &[ShoppingItem]) -> CartaResult<()> {
        let payload = serde_json::to_string(items)
            .map_err(|err| CartaError::io(format!("failed to serialize shopping list: {err}")))?;
        self.kv.set(SHOPPING_LIST_KEY, &payload)
    }
}

pub fn resolve_env_credentials(workspace_root: &Path) -> CartaResult<Option<EnvCredentials>> {
    if let Some(creds) = credentials_from_env() {
        return Ok(Some(creds));
    }

    if let Some(path) = resolve_env_file(workspace_root) {
        let values = load_env_file(&path)?;
        let email = values.get("CARTA_EMAIL").cloned();
        let password = values.get("CARTA_PASSWORD").cloned();

        if let (Some(email), Some(password)) = (email, password)
            && !email.trim().is_empty()
            && !password.is_empty()
        {
            return Ok(Some(EnvCredentials { email, password }));
        }
    }

    Ok(None)
}

fn credentials_from_env() -> Option<EnvCredentials> {
    let email = std::env::var("CARTA_EMAIL").ok()?;
    let password = std::env::var("CARTA_PASSWORD").ok()?;

    if email.trim().is_empty() || password.is_empty() {
        return None;
    }

    Some(EnvCredentials { email, password })
}

fn resolve_env_file(workspace_root: &Path) -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CARTA_ENV_FILE") {
        let candidate = PathBuf::from(path);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    if let Ok(cwd) = std::env::current_dir()
        && let Some(found) = search_upwards_for(&cwd, Path::new(".env"))
    {
        return Some(found);
    }

    search_upwards_for(workspace_root, Path::new(".env"))
}

fn search_upwards_for(start: &Path, relative_path: &Path) -> Option<PathBuf> {
    let mut cursor = Some(start);

    while let Some(path) = cursor {
        let candidate = path.join(relative_path);
        if candidate.exists() {
            return Some(candidate);
        }
        cursor = path.parent();
    }

    None
}

fn load_env_file(path: &Path) -> CartaResult<BTreeMap<String, String>> {
    let raw = fs::read_to_string(path).map_err(|err| {
        CartaError::io(format!(
            "failed to read env file '{}': {}",
            path.display(),
            err
        ))
    })?;

    let mut vars = BTreeMap::new();
    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let mut value = value.trim().to_string();
        if (value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\''))
        {
            value = value[1..value.len() - 1].to_string();
        }

        vars.insert(key.to_string(), value);
    }

    Ok(vars)
}

fn sqlite_error(action: &str, db_path: &Path, err: SqlError) -> CartaError {
    if let SqlError::SqliteFailure(code, message) = &err
        && (code.code == ErrorCode::DatabaseCorrupt || code.code == ErrorCode::NotADatabase)
    {
        let detail = message.as_deref().unwrap_or("sqlite reported corruption");
        return CartaError::io(format!(
            "failed to {action}: state database '{}' is corrupted ({detail}); remove '.carta/state.db' and sign in again to rebuild local state",
            db_path.display()
        ));
    }

    CartaError::io(format!(
        "failed to {action} using state database '{}': {}",
        db_path.display(),
        err
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_blob_uses_the_persisted_field_names() {
        let session = Session {
            access_token: Some("token-1".to_string()),
            user: Some(UserData {
                id: Some(1),
                email: Some("user@example.com".to_string()),
                name: None,
            }),
        };

        let encoded = serde_json::to_string(&session).expect("encode session");
        assert!(encoded.contains("\"accessToken\":\"token-1\""));
        assert!(encoded.contains("\"user\""));
    }

    #[test]
    fn cleared_session_is_not_authenticated() {
        let session = Session::default();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }
}
