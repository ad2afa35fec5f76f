// Search-directory watcher
//
// Owns one filesystem path and diffs its candidate contents between
// refreshes. Detection is polling-based: one directory listing plus a stat
// per candidate, fingerprinted by manifest mtime and size.

use crate::manifest;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::UNIX_EPOCH;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("search directory {0} was disposed")]
    Disposed(Utf8PathBuf),

    #[error("failed to scan {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single observed difference in a search directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirChange {
    /// A candidate path appeared since the last refresh.
    Found(Utf8PathBuf),
    /// A previously observed candidate is gone.
    Removed(Utf8PathBuf),
    /// A candidate is still present but its manifest fingerprint changed.
    Changed(Utf8PathBuf),
}

impl DirChange {
    pub fn path(&self) -> &Utf8Path {
        match self {
            DirChange::Found(path) | DirChange::Removed(path) | DirChange::Changed(path) => path,
        }
    }
}

/// Watches one directory for candidate mods.
///
/// [`refresh`](Self::refresh) may be called from any thread; the
/// observed-path index sits behind a narrow mutex so the orchestrator can
/// run scans on the blocking pool while the consumer context disposes or
/// forgets paths concurrently.
pub struct SearchDirectory {
    path: Utf8PathBuf,
    observed: Mutex<HashMap<Utf8PathBuf, u64>>,
    disposed: AtomicBool,
}

impl SearchDirectory {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self {
            path,
            observed: Mutex::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Scan the directory and diff against the previously observed set.
    ///
    /// Each path produces at most one change per refresh: `Found` for new
    /// candidates, `Removed` for vanished ones, `Changed` when the manifest
    /// fingerprint differs. Changes come back sorted by path so repeated
    /// scans of the same tree are deterministic.
    pub fn refresh(&self) -> Result<Vec<DirChange>, DiscoveryError> {
        if self.is_disposed() {
            return Err(DiscoveryError::Disposed(self.path.clone()));
        }

        let current = self.scan()?;
        let mut observed = self.observed.lock().unwrap();
        let mut changes = Vec::new();

        for (path, fingerprint) in &current {
            match observed.get(path) {
                None => changes.push(DirChange::Found(path.clone())),
                Some(previous) if previous != fingerprint => {
                    changes.push(DirChange::Changed(path.clone()));
                }
                Some(_) => {}
            }
        }
        for path in observed.keys() {
            if !current.contains_key(path) {
                changes.push(DirChange::Removed(path.clone()));
            }
        }

        *observed = current;
        changes.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(changes)
    }

    /// Drop one path from the observed set so a later refresh re-reports it
    /// as found if it is still on disk.
    pub fn forget(&self, path: &Utf8Path) {
        self.observed.lock().unwrap().remove(path);
    }

    /// Stop watching and release the observed-path index. Idempotent.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.observed.lock().unwrap().clear();
        tracing::debug!("search directory {} disposed", self.path);
    }

    fn scan(&self) -> Result<HashMap<Utf8PathBuf, u64>, DiscoveryError> {
        let entries = fs::read_dir(self.path.as_std_path()).map_err(|source| DiscoveryError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut current = HashMap::new();
        for entry in entries {
            let Ok(entry) = entry else { continue };
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                tracing::warn!("skipping non-UTF-8 path under {}", self.path);
                continue;
            };
            if !manifest::is_candidate(&path) {
                continue;
            }
            let print = fingerprint(&path);
            current.insert(path, print);
        }
        Ok(current)
    }
}

/// Cheap content fingerprint: size and mtime of the manifest file, hashed.
/// Falls back to the candidate path itself when no manifest is present yet.
fn fingerprint(candidate: &Utf8Path) -> u64 {
    let target = match manifest::manifest_location(candidate) {
        Ok(manifest_path) => manifest_path,
        Err(_) => candidate.to_path_buf(),
    };

    let mut hasher = DefaultHasher::new();
    if let Ok(meta) = fs::metadata(target.as_std_path()) {
        meta.len().hash(&mut hasher);
        if let Ok(modified) = meta.modified() {
            if let Ok(elapsed) = modified.duration_since(UNIX_EPOCH) {
                elapsed.as_nanos().hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}
