//! Persisted deployment tracking.
//!
//! A single JSON file (`deployments.json`) holds two maps: `current` for
//! in-flight deployments and `published` for completed ones. An id lives in
//! at most one map at a time. Every mutation is a load-modify-save cycle and
//! the save is a full atomic rewrite (tmp file + rename), so a crash leaves
//! either the old or the new file, never a torn one. Single-process access
//! is assumed; there is no cross-process locking.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Deployment;

pub const DEPLOYMENTS_FILE: &str = "deployments.json";

/// The persisted store shape. Maps are `BTreeMap` so iteration order (and
/// therefore batch-operation visit order) is stable across JSON round-trips.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentsData {
    #[serde(default)]
    pub current: BTreeMap<String, Deployment>,
    #[serde(default)]
    pub published: BTreeMap<String, Deployment>,
}

impl DeploymentsData {
    /// Look up an id, checking `current` first, then `published`.
    pub fn get(&self, id: &str) -> Option<&Deployment> {
        self.current.get(id).or_else(|| self.published.get(id))
    }
}

/// Handle on the backing file. All reads and writes go through here.
#[derive(Debug, Clone)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Conventional location: `<state_dir>/deployments.json`.
    pub fn in_dir(state_dir: &Path) -> Self {
        Self::new(state_dir.join(DEPLOYMENTS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the store. A missing file is a valid empty state.
    pub fn load(&self) -> Result<DeploymentsData> {
        if !self.path.exists() {
            return Ok(DeploymentsData::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::io(
                format!("failed to read deployments file {}", self.path.display()),
                e,
            )
        })?;
        serde_json::from_str(&content).map_err(|e| Error::CorruptStore {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Serialize and rewrite the backing file in full.
    pub fn save(&self, data: &DeploymentsData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::io(format!("failed to create state dir {}", parent.display()), e)
            })?;
        }
        atomic_write_json(&self.path, data)
    }

    /// Record a freshly uploaded deployment as in-flight.
    pub fn put_current(&self, deployment: Deployment) -> Result<()> {
        let mut data = self.load()?;
        data.current.insert(deployment.id.clone(), deployment);
        self.save(&data)
    }

    /// Drop an id from `current`. Returns whether anything was removed;
    /// nothing is written when the id was absent.
    pub fn remove_current(&self, id: &str) -> Result<bool> {
        let mut data = self.load()?;
        if data.current.remove(id).is_none() {
            return Ok(false);
        }
        self.save(&data)?;
        Ok(true)
    }

    /// Load, apply `f` to `current[id]` (absent entries are passed as
    /// `None`), store the result back (a `None` result removes the key),
    /// save. The only sanctioned way to mutate a single entry.
    pub fn update(
        &self,
        id: &str,
        f: impl FnOnce(Option<Deployment>) -> Option<Deployment>,
    ) -> Result<()> {
        let mut data = self.load()?;
        let existing = data.current.remove(id);
        if let Some(updated) = f(existing) {
            data.current.insert(id.to_string(), updated);
        }
        self.save(&data)
    }
}

/// Best-effort fsync of the parent directory after a rename, ensuring the
/// directory entry update is durable on crash. Not all platforms support
/// opening a directory for sync, so errors are ignored.
fn fsync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let data = serde_json::to_vec_pretty(value)
        .map_err(|e| Error::InvalidInput(format!("failed to serialize deployments JSON: {e}")))?;

    {
        let mut f = fs::File::create(&tmp)
            .map_err(|e| Error::io(format!("failed to create tmp file {}", tmp.display()), e))?;
        f.write_all(&data)
            .map_err(|e| Error::io(format!("failed to write tmp file {}", tmp.display()), e))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path).map_err(|e| {
        Error::io(
            format!(
                "failed to rename tmp file {} to {}",
                tmp.display(),
                path.display()
            ),
            e,
        )
    })?;

    fsync_parent_dir(path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::types::{DeploymentState, DeploymentStatus};

    fn status(id: &str, state: DeploymentState) -> DeploymentStatus {
        DeploymentStatus {
            deployment_id: id.to_string(),
            deployment_name: "com.example:my-lib:1.0".to_string(),
            deployment_state: state,
            errors: serde_json::Value::Object(Default::default()),
        }
    }

    #[test]
    fn load_returns_empty_store_when_file_missing() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(td.path());
        let data = store.load().expect("load");
        assert!(data.current.is_empty());
        assert!(data.published.is_empty());
    }

    #[test]
    fn save_then_load_is_structurally_identity() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(td.path());

        let mut data = DeploymentsData::default();
        data.current
            .insert("d-1".to_string(), Deployment::new("d-1"));
        data.published.insert(
            "d-0".to_string(),
            Deployment::new("d-0").updated(status("d-0", DeploymentState::Published)),
        );
        store.save(&data).expect("save");

        let loaded = store.load().expect("load");
        assert_eq!(loaded.current.len(), 1);
        assert_eq!(loaded.published.len(), 1);
        assert!(loaded.current.contains_key("d-1"));
        assert_eq!(
            loaded.published["d-0"].state(),
            Some(DeploymentState::Published)
        );

        // A second save of the loaded data produces identical bytes.
        let first = fs::read(store.path()).expect("read");
        store.save(&loaded).expect("re-save");
        let second = fs::read(store.path()).expect("read");
        assert_eq!(first, second);
    }

    #[test]
    fn load_fails_with_corrupt_store_on_malformed_json() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(td.path());
        fs::write(store.path(), "{not-json").expect("write");

        let err = store.load().expect_err("must fail");
        assert!(matches!(err, Error::CorruptStore { .. }));
        assert!(err.to_string().contains("deployments.json"));
    }

    #[test]
    fn get_checks_current_before_published() {
        let mut data = DeploymentsData::default();
        data.current
            .insert("d-1".to_string(), Deployment::new("d-1"));
        data.published.insert(
            "d-1".to_string(),
            Deployment::new("d-1").updated(status("d-1", DeploymentState::Published)),
        );

        let hit = data.get("d-1").expect("present");
        assert!(hit.deployment.is_none(), "current entry should win");
        assert!(data.get("d-2").is_none());
    }

    #[test]
    fn put_current_persists_entry() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(td.path());

        store.put_current(Deployment::new("d-1")).expect("put");
        let data = store.load().expect("load");
        assert!(data.current.contains_key("d-1"));
    }

    #[test]
    fn remove_current_reports_whether_entry_existed() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(td.path());
        store.put_current(Deployment::new("d-1")).expect("put");

        assert!(store.remove_current("d-1").expect("remove"));
        assert!(!store.remove_current("d-1").expect("second remove"));
        assert!(store.load().expect("load").current.is_empty());
    }

    #[test]
    fn update_returning_none_removes_the_entry() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(td.path());
        store.put_current(Deployment::new("d-1")).expect("put");

        store.update("d-1", |_| None).expect("update");
        assert!(store.load().expect("load").current.is_empty());
    }

    #[test]
    fn update_replaces_only_the_targeted_entry() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(td.path());
        store.put_current(Deployment::new("d-1")).expect("put");
        store.put_current(Deployment::new("d-2")).expect("put");

        store
            .update("d-1", |existing| {
                let d = existing.expect("entry present");
                Some(d.updated(status("d-1", DeploymentState::Validating)))
            })
            .expect("update");

        let data = store.load().expect("load");
        assert_eq!(
            data.current["d-1"].state(),
            Some(DeploymentState::Validating)
        );
        assert!(data.current["d-2"].deployment.is_none());
    }

    #[test]
    fn update_passes_none_for_absent_entries() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(td.path());

        let mut seen_absent = false;
        store
            .update("ghost", |existing| {
                seen_absent = existing.is_none();
                None
            })
            .expect("update");
        assert!(seen_absent);
        assert!(store.load().expect("load").current.is_empty());
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(&td.path().join("nested").join("state"));
        store.save(&DeploymentsData::default()).expect("save");
        assert!(store.path().exists());
    }

    #[test]
    fn persisted_shape_matches_external_interface() {
        let td = tempdir().expect("tempdir");
        let store = DeploymentStore::in_dir(td.path());
        store.put_current(Deployment::new("d-1")).expect("put");

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).expect("read")).expect("json");
        let entry = &raw["current"]["d-1"];
        assert_eq!(entry["id"], "d-1");
        assert!(entry["deployment"].is_null());
        assert!(entry["timestamp"].is_string());
        assert!(raw["published"].is_object());
    }
}
