use std::{
    collections::HashMap,
    path::PathBuf,
};

use crate::{
    core::AnkiBridgeError,
    persistence,
};

/// Storage name for the AI provider key. No environment fallback: the key
/// comes from the store the user filled in through settings, or nowhere.
pub const GEMINI_API_KEY: &str = "gemini_api_key";

const CREDENTIALS_FILE: &str = "credentials.json";

/// The local key-value store credentials live in. `get` returning `None`
/// covers both "never set" and "set to empty".
pub trait ApiKeyStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), AnkiBridgeError>;
}

/// JSON-file store under the app data directory.
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new() -> Self {
        Self { path: persistence::get_data_file_path(CREDENTIALS_FILE) }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for FileKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeyStore for FileKeyStore {
    fn get(&self, key: &str) -> Option<String> {
        let map: HashMap<String, String> =
            persistence::read_json_file(&self.path).unwrap_or_default();
        map.get(key).cloned().filter(|value| !value.is_empty())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AnkiBridgeError> {
        let mut map: HashMap<String, String> =
            persistence::read_json_file(&self.path).unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        persistence::write_json_file(&self.path, &map)
    }
}
