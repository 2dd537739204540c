//! Loading and saving the dedup state file.
//!
//! Loading never fails: a missing file is a first run, and an unreadable or
//! malformed file is logged and treated as empty. Saving goes through a sibling
//! temp file and a rename so a crash mid-write cannot leave a truncated record.

use crate::error::StateError;
use crate::models::PersistedState;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

/// Read the persisted state, falling back to empty on any problem.
///
/// # Arguments
///
/// * `path` - Location of the state file, usually `<output_dir>/last_id.json`
///
/// # Returns
///
/// The stored record. Anything other than a readable JSON object yields
/// `PersistedState::default()`.
///
/// # Examples
///
/// ```ignore
/// let state = state::load(Path::new("out/last_id.json")).await;
/// if gate::is_duplicate(&fp, &state) { /* skip */ }
/// ```
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load(path: &Path) -> PersistedState {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No state file yet; starting empty");
            return PersistedState::default();
        }
        Err(e) => {
            warn!(error = %e, "State file unreadable; starting empty");
            return PersistedState::default();
        }
    };

    // Only a JSON object is a record.
    let parsed = serde_json::from_str::<serde_json::Value>(&raw).and_then(|value| match value {
        serde_json::Value::Object(_) => serde_json::from_value::<PersistedState>(value),
        other => Err(serde::de::Error::custom(format!(
            "expected an object, found {}",
            json_kind(&other)
        ))),
    });
    match parsed {
        Ok(state) => {
            info!(last_id = ?state.last_id, "Loaded state");
            state
        }
        Err(e) => {
            warn!(error = %e, "State file corrupt; starting empty");
            PersistedState::default()
        }
    }
}

/// Atomically replace the state file with `state`.
///
/// Missing parent directories are created. The record is written to
/// `<name>.tmp` next to `path` and renamed over it.
///
/// # Returns
///
/// `Ok(())` once the rename succeeded, or [`StateError`] when the record
/// could not be written. The previous file is left intact on error.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn save(path: &Path, state: &PersistedState) -> Result<(), StateError> {
    let json = serde_json::to_string_pretty(state)?;
    let write_err = |source| StateError::Write {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp = temp_path(path);
    fs::write(&tmp, json).await.map_err(write_err)?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(write_err(e));
    }
    info!(last_id = ?state.last_id, "Saved state");
    Ok(())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "state".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate;
    use crate::models::NewsItem;
    use chrono::Utc;

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = load(&dir.path().join("last_id.json")).await;
        assert_eq!(state, PersistedState::default());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_id.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load(&path).await, PersistedState::default());

        std::fs::write(&path, r#"["wrong", "shape"]"#).unwrap();
        assert_eq!(load(&path).await, PersistedState::default());
    }

    #[tokio::test]
    async fn test_non_object_json_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_id.json");
        for body in [r#""last""#, "42", "null", "true", r#"[["a"]]"#] {
            std::fs::write(&path, body).unwrap();
            assert_eq!(load(&path).await, PersistedState::default(), "body: {body}");
        }

        std::fs::write(&path, r#"{"last_id": "abc", "unknown": 1}"#).unwrap();
        assert_eq!(load(&path).await.last_id.map(|f| f.to_string()).as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_save_then_load_preserves_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("last_id.json");
        let item = NewsItem::new("Market rallies", "https://a.example/x");
        let fp = gate::fingerprint(&item.title, &item.link);
        let state = gate::commit(fp.clone(), &item, &PersistedState::default(), Utc::now());

        save(&path, &state).await.unwrap();
        let loaded = load(&path).await;

        assert!(gate::is_duplicate(&fp, &loaded));
        assert_eq!(loaded.last_link.as_deref(), Some("https://a.example/x"));
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_id.json");
        std::fs::write(&path, "garbage").unwrap();

        let state = gate::commit_manual("Manual headline", &PersistedState::default(), Utc::now());
        save(&path, &state).await.unwrap();

        let loaded = load(&path).await;
        assert_eq!(loaded.last_id, state.last_id);
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let p = Path::new("/tmp/out/last_id.json");
        assert_eq!(temp_path(p), PathBuf::from("/tmp/out/last_id.json.tmp"));
    }
}
