use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::ClientError;

pub const TOKEN_KEY: &str = "token";
const STORAGE_FILE: &str = "storage.json";

/// Small persistent key/value store kept as JSON in the data directory.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl LocalStorage {
    pub fn open(data_dir: &Path) -> Result<Self, ClientError> {
        let path = data_dir.join(STORAGE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => match serde_json::from_str::<Value>(&text)? {
                Value::Object(map) => map,
                _ => {
                    tracing::warn!("{} is not a JSON object; starting empty", path.display());
                    Map::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(ClientError::Storage(format!("{}: {}", path.display(), e))),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        self.entries.insert(key.to_string(), Value::String(value.to_string()));
        self.persist()
    }

    pub fn remove(&mut self, key: &str) -> Result<bool, ClientError> {
        let existed = self.entries.remove(key).is_some();
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }

    fn persist(&self) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ClientError::Storage(format!("{}: {}", parent.display(), e)))?;
        }
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, text)
            .map_err(|e| ClientError::Storage(format!("{}: {}", self.path.display(), e)))
    }
}

/// Credential handed to the HTTP client at construction.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Explicit override first, then the stored `token` entry.
    pub fn resolve(override_token: Option<&str>, storage: &LocalStorage) -> Self {
        let token = override_token.or_else(|| storage.get(TOKEN_KEY)).map(str::to_string);
        Self::new(token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Value of the `Authorization` header. A missing token is still sent,
    /// as `Bearer undefined`; the backend has always received it that way.
    pub fn authorization(&self) -> String {
        match &self.token {
            Some(token) => format!("Bearer {}", token),
            None => {
                tracing::warn!("no stored token; sending 'Bearer undefined'");
                "Bearer undefined".to_string()
            }
        }
    }
}
