// Mod entity and load-state machine

use crate::manifest::{ContentType, ModManifest};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::sync::RwLock;

/// Lifecycle state of a discovered mod.
///
/// `Invalid` is terminal: the mod is permanently out of consideration and
/// only lingers so in-flight operations can observe the invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Unloading,
    Invalid,
}

impl LoadState {
    /// Whether an in-flight operation currently owns this mod.
    pub fn is_busy(&self) -> bool {
        matches!(self, LoadState::Loading | LoadState::Unloading)
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoadState::Unloaded => "unloaded",
            LoadState::Loading => "loading",
            LoadState::Loaded => "loaded",
            LoadState::Unloading => "unloading",
            LoadState::Invalid => "invalid",
        };
        f.write_str(label)
    }
}

/// One discovered mod: identity, manifest metadata, load state, and
/// relationships to the rest of the collection.
///
/// Shared as `Arc<Mod>` between the manager, background discovery tasks,
/// and host callbacks. The state and relationship cells are written only by
/// the manager's consumer context; the locks exist for cross-thread
/// visibility, not for contention.
pub struct Mod {
    manifest: ModManifest,
    name: String,
    path: Utf8PathBuf,
    content_type: ContentType,
    state: RwLock<LoadState>,
    conflicts: RwLock<Vec<String>>,
    dependencies: RwLock<Vec<String>>,
    dependents: RwLock<Vec<String>>,
}

impl Mod {
    pub(crate) fn new(manifest: ModManifest, path: Utf8PathBuf) -> Self {
        let name = crate::manifest::mod_name(&path);
        let content_type = manifest.content_type();
        Self {
            manifest,
            name,
            path,
            content_type,
            state: RwLock::new(LoadState::Unloaded),
            conflicts: RwLock::new(Vec::new()),
            dependencies: RwLock::new(Vec::new()),
            dependents: RwLock::new(Vec::new()),
        }
    }

    /// Declared identity, used for dependency references.
    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    /// Display name derived from the filesystem path.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn manifest(&self) -> &ModManifest {
        &self.manifest
    }

    pub fn state(&self) -> LoadState {
        *self.state.read().unwrap()
    }

    pub(crate) fn set_state(&self, next: LoadState) {
        *self.state.write().unwrap() = next;
    }

    pub fn is_valid(&self) -> bool {
        self.state() != LoadState::Invalid
    }

    /// Ids of mods this one collides with over shared resources.
    pub fn conflicts(&self) -> Vec<String> {
        self.conflicts.read().unwrap().clone()
    }

    /// Resolved dependency ids, in declaration order.
    pub fn dependencies(&self) -> Vec<String> {
        self.dependencies.read().unwrap().clone()
    }

    /// Ids of mods that depend on this one.
    pub fn dependents(&self) -> Vec<String> {
        self.dependents.read().unwrap().clone()
    }

    pub(crate) fn set_relations(
        &self,
        conflicts: Vec<String>,
        dependencies: Vec<String>,
        dependents: Vec<String>,
    ) {
        *self.conflicts.write().unwrap() = conflicts;
        *self.dependencies.write().unwrap() = dependencies;
        *self.dependents.write().unwrap() = dependents;
    }
}

impl fmt::Debug for Mod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mod")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}
