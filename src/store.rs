// JSON persistence for tracked lists, the guild snapshot and online status.
//
// Files are read once and written once per run. Writes go to a sibling
// `.tmp` file that is renamed over the target, so a crash leaves the
// previous contents in place.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::online::OnlineStatus;
use crate::reconcile::GuildSnapshot;

/// Read a file, treating "not found" as `None`.
fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let Some(text) = read_optional(path)? else {
        tracing::warn!(path = %path.display(), "File not found, starting empty");
        return Ok(T::default());
    };
    serde_json::from_str(&text).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a JSON array of names. A missing file is an empty list.
pub fn load_list(path: &Path) -> Result<Vec<String>, StoreError> {
    let value: Value = match read_optional(path)? {
        Some(text) => serde_json::from_str(&text).map_err(|source| StoreError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            tracing::warn!(path = %path.display(), "File not found, using empty list");
            return Ok(Vec::new());
        }
    };

    let not_an_array = || StoreError::NotAnArray {
        path: path.to_path_buf(),
    };
    value
        .as_array()
        .ok_or_else(not_an_array)?
        .iter()
        .map(|v| v.as_str().map(String::from).ok_or_else(not_an_array))
        .collect()
}

pub fn load_snapshot(path: &Path) -> Result<GuildSnapshot, StoreError> {
    load_or_default(path)
}

pub fn load_online_status(path: &Path) -> Result<OnlineStatus, StoreError> {
    load_or_default(path)
}

/// Serialize with a 4-space indent.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn write_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let bytes = to_pretty_json(value).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = tmp_path(path);
    std::fs::write(&tmp, bytes).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

pub fn save_list(path: &Path, names: &[String]) -> Result<(), StoreError> {
    write_atomic(path, names)?;
    tracing::info!(path = %path.display(), "Saved {} entries", names.len());
    Ok(())
}

pub fn save_snapshot(path: &Path, snapshot: &GuildSnapshot) -> Result<(), StoreError> {
    write_atomic(path, snapshot)?;
    tracing::info!(path = %path.display(), "Saved snapshot with {} worlds", snapshot.len());
    Ok(())
}

pub fn save_online_status(path: &Path, status: &OnlineStatus) -> Result<(), StoreError> {
    write_atomic(path, status)
}
