use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const ACCESS_TOKEN_ENV_VAR: &str = "OFFICE_ACCESS_TOKEN";
pub(crate) const DEFAULT_ROOM_ID: &str = "lobby";

/// Source of the bearer token sent in the `auth` message.
pub(crate) trait SessionProvider {
    fn access_token(&self) -> Option<String>;
}

#[derive(Debug, Default)]
pub(crate) struct EnvSessionProvider;

impl SessionProvider for EnvSessionProvider {
    fn access_token(&self) -> Option<String> {
        std::env::var(ACCESS_TOKEN_ENV_VAR)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Error)]
pub(crate) enum RoomStoreError {
    #[error("failed to read room file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("room file {path} is invalid at {json_path}: {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode room file: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write room file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRoom {
    #[serde(rename = "roomId")]
    room_id: String,
}

/// The last joined room, persisted across runs.
#[derive(Debug, Clone)]
pub(crate) struct RoomStore {
    path: PathBuf,
}

impl RoomStore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub(crate) fn load(&self) -> Result<Option<String>, RoomStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RoomStoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        let stored: StoredRoom =
            serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
                RoomStoreError::Parse {
                    path: self.path.clone(),
                    json_path: error.path().to_string(),
                    source: error.into_inner(),
                }
            })?;
        Ok(Some(stored.room_id).filter(|room_id| !room_id.is_empty()))
    }

    pub(crate) fn save(&self, room_id: &str) -> Result<(), RoomStoreError> {
        let text = serde_json::to_string_pretty(&StoredRoom {
            room_id: room_id.to_string(),
        })
        .map_err(RoomStoreError::Encode)?;
        write_text_atomic(&self.path, &text).map_err(|source| RoomStoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    /// Picks the room to join: the requested one, else the saved one, else
    /// the default. A requested room is saved for next time.
    pub(crate) fn resolve(&self, requested: Option<&str>) -> String {
        if let Some(room_id) = requested {
            if let Err(error) = self.save(room_id) {
                warn!(error = %error, "room_store_save_failed");
            }
            info!(room_id, "room_selected");
            return room_id.to_string();
        }
        let room_id = match self.load() {
            Ok(Some(room_id)) => room_id,
            Ok(None) => DEFAULT_ROOM_ID.to_string(),
            Err(error) => {
                warn!(error = %error, "room_store_load_failed_using_default");
                DEFAULT_ROOM_ID.to_string()
            }
        };
        info!(room_id = room_id.as_str(), "room_selected");
        room_id
    }
}

fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text)?;

    match fs::remove_file(path) {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(error);
        }
    }
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("room.json");
    path.with_file_name(format!("{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, RoomStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = RoomStore::new(dir.path().join("cache").join("room.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_loads_as_none() {
        let (_dir, store) = store();
        assert!(store.load().expect("load").is_none());
        assert_eq!(store.resolve(None), DEFAULT_ROOM_ID);
    }

    #[test]
    fn requested_room_is_persisted() {
        let (_dir, store) = store();

        assert_eq!(store.resolve(Some("standup")), "standup");
        assert_eq!(store.load().expect("load").as_deref(), Some("standup"));
        assert_eq!(store.resolve(None), "standup");
        assert!(!temp_path_for(store.path()).exists());
    }

    #[test]
    fn corrupt_file_reports_path_and_falls_back() {
        let (_dir, store) = store();
        fs::create_dir_all(store.path().parent().expect("parent")).expect("mkdir");
        fs::write(store.path(), r#"{"roomId": 4}"#).expect("write");

        match store.load() {
            Err(RoomStoreError::Parse { json_path, .. }) => assert_eq!(json_path, "roomId"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(store.resolve(None), DEFAULT_ROOM_ID);
    }

    #[test]
    fn file_uses_room_id_key() {
        let (_dir, store) = store();
        store.save("r-9").expect("save");

        let raw = fs::read_to_string(store.path()).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value, serde_json::json!({"roomId": "r-9"}));
    }
}
