use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

use serde::{
    de::DeserializeOwned,
    Serialize,
};

use crate::core::AnkiBridgeError;

const APP_NAME: &str = "ankibridge";

pub fn get_app_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join(APP_NAME);
        let _ = fs::create_dir_all(&app_dir);
        app_dir
    } else {
        PathBuf::from(".")
    }
}

pub fn get_data_file_path(filename: &str) -> PathBuf {
    get_app_data_dir().join(filename)
}

pub fn write_json_file<T: Serialize>(path: &Path, data: &T) -> Result<(), AnkiBridgeError> {
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    Ok(())
}

/// Missing files read as the default value; stores own their first write.
pub fn read_json_file<T: DeserializeOwned + Default>(path: &Path) -> Result<T, AnkiBridgeError> {
    if !path.exists() {
        return Ok(T::default());
    }

    let json = fs::read_to_string(path)?;
    let data: T = serde_json::from_str(&json)?;
    Ok(data)
}

pub fn save_json<T: Serialize>(data: &T, filename: &str) -> Result<(), AnkiBridgeError> {
    let file_path = get_data_file_path(filename);
    write_json_file(&file_path, data)?;
    println!("Data saved to: {}", file_path.display());
    Ok(())
}

pub fn load_json<T: DeserializeOwned + Default>(filename: &str) -> Result<T, AnkiBridgeError> {
    read_json_file(&get_data_file_path(filename))
}

pub fn load_json_or_default<T: DeserializeOwned + Default>(filename: &str) -> T {
    match load_json::<T>(filename) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to load {}: {}. Using defaults.", filename, e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ankibridge-test-{}-{}.json", std::process::id(), name))
    }

    #[test]
    fn json_round_trip() {
        let path = temp_path("roundtrip");
        let mut data = HashMap::new();
        data.insert("key".to_string(), "value".to_string());

        write_json_file(&path, &data).unwrap();
        let loaded: HashMap<String, String> = read_json_file(&path).unwrap();
        assert_eq!(loaded, data);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_reads_as_default() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);

        let loaded: HashMap<String, String> = read_json_file(&path).unwrap();
        assert!(loaded.is_empty());
    }
}
