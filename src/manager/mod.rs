// Mod manager orchestration
//
// Background tasks (directory scans, manifest parsing, host payload work)
// never touch the mod collection; they enqueue closures on the dispatcher
// and the embedding application drains them from its own update loop. All
// collection mutation, relationship recomputation, and event emission
// happen inside drained jobs, serialized on that one context. The path
// index is the only structure background tasks touch directly, behind a
// narrow mutex.

use crate::config::HostSettings;
use crate::discovery::{DirChange, SearchDirectory};
use crate::dispatch::Dispatcher;
use crate::host::{CancelSignal, ModHost};
use crate::manifest::{self, ManifestError, ModManifest};
use crate::mods::{LoadState, Mod};
use crate::resolve;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};

/// Notifications surfaced to the embedding application.
///
/// Emitted on the consumer context; receive them anywhere via
/// [`ModManager::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModEvent {
    /// The mod collection was mutated.
    ModsChanged,
    ModFound(String),
    ModRemoved(String),
    ModLoaded(String),
    ModUnloaded(String),
    ModLoadCancelled(String),
    SceneLoaded { mod_id: String, scene: String },
    SceneUnloaded { mod_id: String, scene: String },
    SceneLoadCancelled { mod_id: String, scene: String },
}

/// State reachable from background tasks.
struct Shared {
    dispatcher: Dispatcher<Core>,
    /// Path -> authoritative mod instance. Lookup-or-insert only; never
    /// holds a partially constructed mod.
    path_index: Mutex<HashMap<Utf8PathBuf, Arc<Mod>>>,
    settings: HostSettings,
}

/// Consumer-owned state. Mutated exclusively through drained dispatcher
/// jobs and the public methods of [`ModManager`].
struct Core {
    shared: Arc<Shared>,
    host: Arc<dyn ModHost>,
    runtime: Handle,
    events_tx: broadcast::Sender<ModEvent>,
    mods: IndexMap<String, Arc<Mod>>,
    watchers: IndexMap<Utf8PathBuf, Arc<SearchDirectory>>,
    /// Mods whose removal waits for an in-flight load/unload to settle.
    pending_removals: IndexSet<String>,
    /// Cancel senders for in-flight load operations, keyed by mod id.
    active_loads: HashMap<String, watch::Sender<bool>>,
    /// Cancel senders for in-flight scene loads, keyed by (mod id, scene).
    scene_loads: HashMap<(String, String), watch::Sender<bool>>,
    loaded_scenes: IndexMap<String, IndexSet<String>>,
    refresh_timer: Option<watch::Sender<bool>>,
    disposed: bool,
}

/// Owns the authoritative mod collection and the registered search
/// directories, and wires watcher notifications to collection mutations
/// through the dispatcher.
///
/// Construct one per host application and call [`update`](Self::update)
/// from the context that is allowed to observe mutations — a game loop
/// tick, a UI timer, or a dedicated task. Background work is spawned on
/// the supplied tokio runtime handle.
pub struct ModManager {
    core: Core,
}

impl ModManager {
    pub fn new(host: Arc<dyn ModHost>, settings: HostSettings, runtime: Handle) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        let shared = Arc::new(Shared {
            dispatcher: Dispatcher::new(),
            path_index: Mutex::new(HashMap::new()),
            settings,
        });

        Self {
            core: Core {
                shared,
                host,
                runtime,
                events_tx,
                mods: IndexMap::new(),
                watchers: IndexMap::new(),
                pending_removals: IndexSet::new(),
                active_loads: HashMap::new(),
                scene_loads: HashMap::new(),
                loaded_scenes: IndexMap::new(),
                refresh_timer: None,
                disposed: false,
            },
        }
    }

    /// Subscribe to mod and scene notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ModEvent> {
        self.core.events_tx.subscribe()
    }

    /// Drain pending dispatcher work on the caller's context.
    ///
    /// This is the consumer tick: every collection mutation and event runs
    /// inside it. Returns the number of work items executed.
    pub fn update(&mut self) -> usize {
        let shared = self.core.shared.clone();
        shared.dispatcher.drain(&mut self.core)
    }

    /// Insertion-ordered snapshot of all currently known mods.
    pub fn mods(&self) -> Vec<Arc<Mod>> {
        self.core
            .mods
            .values()
            .filter(|unit| unit.is_valid())
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Mod>> {
        self.core
            .mods
            .get(id)
            .filter(|unit| unit.is_valid())
            .cloned()
    }

    pub fn search_directories(&self) -> Vec<Utf8PathBuf> {
        self.core.watchers.keys().cloned().collect()
    }

    /// Register a directory to watch and scan it immediately.
    ///
    /// Returns `Ok(false)` when an equivalent (canonicalized) directory is
    /// already registered.
    pub fn add_search_directory<P: AsRef<Utf8Path>>(&mut self, path: P) -> Result<bool> {
        anyhow::ensure!(!self.core.disposed, "mod manager was disposed");

        let canonical = canonicalize(path.as_ref())?;
        if self.core.watchers.contains_key(&canonical) {
            tracing::debug!("search directory {} already registered", canonical);
            return Ok(false);
        }

        let watcher = Arc::new(SearchDirectory::new(canonical.clone()));
        self.core.watchers.insert(canonical.clone(), watcher.clone());
        tracing::info!("search directory {} added", canonical);

        Core::spawn_scan(&self.core.shared, &self.core.runtime, watcher);
        Ok(true)
    }

    /// Dispose and forget the matching watcher. No-op if not found.
    pub fn remove_search_directory<P: AsRef<Utf8Path>>(&mut self, path: P) -> bool {
        // The directory may already be gone from disk; fall back to the
        // raw path as the lookup key.
        let key = canonicalize(path.as_ref()).unwrap_or_else(|_| path.as_ref().to_path_buf());
        match self.core.watchers.shift_remove(&key) {
            Some(watcher) => {
                watcher.dispose();
                tracing::info!("search directory {} removed", key);
                true
            }
            None => false,
        }
    }

    /// Scan every registered directory on the blocking pool.
    pub fn refresh_search_directories(&self) {
        if self.core.disposed {
            return;
        }
        self.core.refresh_all();
    }

    /// Start, restart, or stop the automatic refresh timer.
    ///
    /// The previous timer is always cancelled before a new one starts, so
    /// two can never run concurrently. `None` or a zero interval disables
    /// automatic refreshing.
    pub fn set_refresh_interval(&mut self, interval: Option<Duration>) {
        self.core.set_refresh_interval(interval);
    }

    /// Begin loading an unloaded mod. Returns false when the request is
    /// not applicable (unknown id, wrong state, removal pending).
    pub fn request_load(&mut self, id: &str) -> bool {
        self.core.request_load(id)
    }

    /// Begin unloading a loaded mod, or cancel an in-flight load.
    pub fn request_unload(&mut self, id: &str) -> bool {
        self.core.request_unload(id)
    }

    /// Begin loading a declared scene of a loaded mod.
    pub fn load_scene(&mut self, id: &str, scene: &str) -> bool {
        self.core.request_scene_load(id, scene)
    }

    /// Begin unloading a previously loaded scene.
    pub fn unload_scene(&mut self, id: &str, scene: &str) -> bool {
        self.core.request_scene_unload(id, scene)
    }

    /// Tear everything down: cancel in-flight work, unload loaded mods,
    /// invalidate the collection, dispose every watcher. Idempotent.
    pub fn dispose(&mut self) {
        self.core.dispose();
    }
}

impl Drop for ModManager {
    fn drop(&mut self) {
        self.core.dispose();
    }
}

impl Core {
    fn emit(&self, event: ModEvent) {
        // It's fine if no one is listening.
        let _ = self.events_tx.send(event);
    }

    fn resolve_all(&mut self) {
        let active: Vec<Arc<Mod>> = self
            .mods
            .values()
            .filter(|unit| unit.is_valid())
            .cloned()
            .collect();
        resolve::resolve_collection(&active);
    }

    fn refresh_all(&self) {
        for watcher in self.watchers.values() {
            Self::spawn_scan(&self.shared, &self.runtime, watcher.clone());
        }
    }

    fn spawn_scan(shared: &Arc<Shared>, runtime: &Handle, watcher: Arc<SearchDirectory>) {
        let shared = shared.clone();
        runtime.spawn_blocking(move || {
            let changes = match watcher.refresh() {
                Ok(changes) => changes,
                Err(err) => {
                    tracing::debug!("scan skipped: {err}");
                    return;
                }
            };
            for change in changes {
                match change {
                    DirChange::Found(path) => Self::handle_found(&shared, path),
                    DirChange::Removed(path) => Self::handle_removed(&shared, path),
                    DirChange::Changed(path) => Self::handle_changed(&shared, path),
                }
            }
        });
    }

    // Runs on the blocking pool. Parses the manifest and records the new
    // mod in the path index; collection insertion happens on the consumer.
    fn handle_found(shared: &Arc<Shared>, path: Utf8PathBuf) {
        if shared.path_index.lock().unwrap().contains_key(&path) {
            return;
        }

        let parsed = match manifest::parse_manifest(&path) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!("ignoring candidate {}: {err}", path);
                return;
            }
        };
        if let Err(err) = check_supported(&parsed, &shared.settings) {
            tracing::info!("skipping mod at {}: {err}", path);
            return;
        }

        let unit = Arc::new(Mod::new(parsed, path.clone()));
        {
            let mut index = shared.path_index.lock().unwrap();
            if index.contains_key(&path) {
                // Lost the race to a concurrent scan of the same path.
                return;
            }
            index.insert(path, unit.clone());
        }

        shared
            .dispatcher
            .enqueue(move |core: &mut Core| core.insert_mod(unit));
    }

    // Runs on the blocking pool. A busy mod is never removed here; the
    // consumer finalizes it once the in-flight operation reports.
    fn handle_removed(shared: &Arc<Shared>, path: Utf8PathBuf) {
        let unit = shared.path_index.lock().unwrap().get(&path).cloned();
        let Some(unit) = unit else {
            // Transient: the path was never a known mod.
            return;
        };

        if unit.state().is_busy() {
            let id = unit.id().to_string();
            let key = format!("defer-remove:{id}");
            shared
                .dispatcher
                .enqueue_keyed(&key, move |core: &mut Core| core.defer_removal(&id));
            return;
        }

        shared.path_index.lock().unwrap().remove(&path);
        let id = unit.id().to_string();
        shared
            .dispatcher
            .enqueue(move |core: &mut Core| core.remove_mod(&id));
    }

    // A changed path is a full re-parse: remove then re-find. The
    // dispatcher's FIFO order keeps the two collection jobs in sequence.
    fn handle_changed(shared: &Arc<Shared>, path: Utf8PathBuf) {
        tracing::debug!("candidate {} changed, re-parsing", path);
        Self::handle_removed(shared, path.clone());
        Self::handle_found(shared, path);
    }

    fn insert_mod(&mut self, unit: Arc<Mod>) {
        if self.disposed {
            self.shared.path_index.lock().unwrap().remove(unit.path());
            return;
        }

        if let Some(existing) = self.mods.get(unit.id()) {
            tracing::warn!(
                "duplicate mod id {}: keeping {}, rejecting {}",
                unit.id(),
                existing.path(),
                unit.path()
            );
            self.shared.path_index.lock().unwrap().remove(unit.path());
            unit.set_state(LoadState::Invalid);
            return;
        }

        self.mods.insert(unit.id().to_string(), unit.clone());
        self.resolve_all();
        tracing::info!(
            "mod {} found at {} ({})",
            unit.id(),
            unit.path(),
            unit.content_type().describe()
        );
        self.emit(ModEvent::ModFound(unit.id().to_string()));
        self.emit(ModEvent::ModsChanged);
    }

    fn defer_removal(&mut self, id: &str) {
        if self.mods.contains_key(id) && self.pending_removals.insert(id.to_string()) {
            tracing::info!("mod {id} is busy, removal deferred until the operation settles");
            // Don't let a pending load hold the removal open.
            self.cancel_load(id);
        }
    }

    fn remove_mod(&mut self, id: &str) {
        let Some(unit) = self.mods.get(id).cloned() else {
            return;
        };

        if unit.state().is_busy() {
            // The state moved on between the background check and this job;
            // the in-flight operation now owns the removal.
            self.shared
                .path_index
                .lock()
                .unwrap()
                .insert(unit.path().to_path_buf(), unit.clone());
            self.pending_removals.insert(id.to_string());
            tracing::info!("mod {id} became busy before removal, deferring");
            self.cancel_load(id);
            return;
        }

        self.finalize_removal(&unit);
    }

    fn finalize_removal(&mut self, unit: &Arc<Mod>) {
        let id = unit.id().to_string();
        self.pending_removals.shift_remove(&id);
        self.active_loads.remove(&id);
        self.loaded_scenes.shift_remove(&id);
        self.shared.path_index.lock().unwrap().remove(unit.path());

        unit.set_state(LoadState::Invalid);
        self.mods.shift_remove(&id);
        self.resolve_all();
        self.forget_path(unit.path());

        tracing::info!("mod {id} removed");
        self.emit(ModEvent::ModRemoved(id));
        self.emit(ModEvent::ModsChanged);
    }

    // Make the owning watcher re-report the path if it is still on disk
    // (deferred removals and busy changed-paths end up here).
    fn forget_path(&self, path: &Utf8Path) {
        if let Some(parent) = path.parent() {
            if let Some(watcher) = self.watchers.get(parent) {
                watcher.forget(path);
            }
        }
    }

    fn try_finalize_pending(&mut self, id: &str) {
        if !self.pending_removals.contains(id) {
            return;
        }
        let Some(unit) = self.mods.get(id).cloned() else {
            self.pending_removals.shift_remove(id);
            return;
        };
        match unit.state() {
            LoadState::Unloaded => self.finalize_removal(&unit),
            // The load completed before the cancel landed; unload first,
            // the removal continues when that settles.
            LoadState::Loaded => self.begin_unload(unit),
            _ => {}
        }
    }

    fn cancel_load(&self, id: &str) {
        if let Some(cancel) = self.active_loads.get(id) {
            let _ = cancel.send(true);
        }
    }

    fn cancel_scene_loads(&self, id: &str) {
        for (key, cancel) in &self.scene_loads {
            if key.0 == id {
                let _ = cancel.send(true);
            }
        }
    }

    fn request_load(&mut self, id: &str) -> bool {
        if self.disposed {
            return false;
        }
        let Some(unit) = self.mods.get(id).cloned() else {
            return false;
        };
        if self.pending_removals.contains(id) {
            tracing::debug!("load of {id} ignored, removal pending");
            return false;
        }
        if unit.state() != LoadState::Unloaded {
            tracing::debug!("load of {id} ignored in state {}", unit.state());
            return false;
        }

        unit.set_state(LoadState::Loading);
        let (cancel_tx, cancel) = CancelSignal::new();
        self.active_loads.insert(id.to_string(), cancel_tx);
        tracing::info!("loading mod {id}");

        let shared = self.shared.clone();
        let host = self.host.clone();
        self.runtime.spawn_blocking(move || {
            let result = host.load(&unit, &cancel);
            shared
                .dispatcher
                .enqueue(move |core: &mut Core| core.finish_load(unit, result, cancel));
        });
        true
    }

    fn finish_load(&mut self, unit: Arc<Mod>, result: Result<()>, cancel: CancelSignal) {
        let id = unit.id().to_string();
        self.active_loads.remove(&id);

        if unit.state() != LoadState::Loading {
            // Invalidated while the payload was in flight (teardown).
            return;
        }

        if cancel.is_cancelled() {
            unit.set_state(LoadState::Unloaded);
            tracing::info!("mod {id} load cancelled");
            self.emit(ModEvent::ModLoadCancelled(id.clone()));
        } else {
            match result {
                Ok(()) => {
                    unit.set_state(LoadState::Loaded);
                    tracing::info!("mod {id} loaded");
                    self.emit(ModEvent::ModLoaded(id.clone()));
                }
                Err(err) => {
                    unit.set_state(LoadState::Unloaded);
                    tracing::warn!("mod {id} failed to load: {err:#}");
                }
            }
        }

        self.try_finalize_pending(&id);
    }

    fn request_unload(&mut self, id: &str) -> bool {
        let Some(unit) = self.mods.get(id).cloned() else {
            return false;
        };
        match unit.state() {
            LoadState::Loaded => {
                self.begin_unload(unit);
                true
            }
            LoadState::Loading => {
                // Cancellation path: the load task observes the signal and
                // reports through its own completion.
                self.cancel_load(id);
                true
            }
            _ => false,
        }
    }

    fn begin_unload(&mut self, unit: Arc<Mod>) {
        unit.set_state(LoadState::Unloading);
        self.cancel_scene_loads(unit.id());
        tracing::info!("unloading mod {}", unit.id());

        let shared = self.shared.clone();
        let host = self.host.clone();
        self.runtime.spawn_blocking(move || {
            let result = host.unload(&unit);
            shared
                .dispatcher
                .enqueue(move |core: &mut Core| core.finish_unload(unit, result));
        });
    }

    fn finish_unload(&mut self, unit: Arc<Mod>, result: Result<()>) {
        let id = unit.id().to_string();
        if unit.state() != LoadState::Unloading {
            return;
        }
        if let Err(err) = result {
            tracing::warn!("mod {id} unload reported failure: {err:#}");
        }

        // Scene bookkeeping goes down with the payload; the host tears the
        // scenes themselves down as part of unload.
        if let Some(scenes) = self.loaded_scenes.shift_remove(&id) {
            for scene in scenes {
                self.emit(ModEvent::SceneUnloaded {
                    mod_id: id.clone(),
                    scene,
                });
            }
        }

        unit.set_state(LoadState::Unloaded);
        tracing::info!("mod {id} unloaded");
        self.emit(ModEvent::ModUnloaded(id.clone()));
        self.try_finalize_pending(&id);
    }

    fn request_scene_load(&mut self, id: &str, scene: &str) -> bool {
        if self.disposed {
            return false;
        }
        let Some(unit) = self.mods.get(id).cloned() else {
            return false;
        };
        if unit.state() != LoadState::Loaded {
            tracing::debug!("scene {scene} of {id} ignored, mod not loaded");
            return false;
        }
        if !unit.manifest().scenes.iter().any(|s| s == scene) {
            tracing::debug!("mod {id} declares no scene named {scene}");
            return false;
        }
        if self
            .loaded_scenes
            .get(id)
            .is_some_and(|set| set.contains(scene))
        {
            return false;
        }
        let key = (id.to_string(), scene.to_string());
        if self.scene_loads.contains_key(&key) {
            return false;
        }

        let (cancel_tx, cancel) = CancelSignal::new();
        self.scene_loads.insert(key, cancel_tx);
        tracing::info!("loading scene {scene} of mod {id}");

        let shared = self.shared.clone();
        let host = self.host.clone();
        let scene = scene.to_string();
        self.runtime.spawn_blocking(move || {
            let result = host.load_scene(&unit, &scene, &cancel);
            shared
                .dispatcher
                .enqueue(move |core: &mut Core| core.finish_scene_load(unit, scene, result, cancel));
        });
        true
    }

    fn finish_scene_load(
        &mut self,
        unit: Arc<Mod>,
        scene: String,
        result: Result<()>,
        cancel: CancelSignal,
    ) {
        let id = unit.id().to_string();
        self.scene_loads.remove(&(id.clone(), scene.clone()));

        if unit.state() != LoadState::Loaded || cancel.is_cancelled() {
            tracing::info!("scene {scene} of mod {id} load cancelled");
            self.emit(ModEvent::SceneLoadCancelled { mod_id: id, scene });
            return;
        }

        match result {
            Ok(()) => {
                self.loaded_scenes
                    .entry(id.clone())
                    .or_insert_with(IndexSet::new)
                    .insert(scene.clone());
                tracing::info!("scene {scene} of mod {id} loaded");
                self.emit(ModEvent::SceneLoaded { mod_id: id, scene });
            }
            Err(err) => {
                tracing::warn!("scene {scene} of mod {id} failed to load: {err:#}");
            }
        }
    }

    fn request_scene_unload(&mut self, id: &str, scene: &str) -> bool {
        let Some(unit) = self.mods.get(id).cloned() else {
            return false;
        };
        let Some(set) = self.loaded_scenes.get_mut(id) else {
            return false;
        };
        if !set.shift_remove(scene) {
            return false;
        }
        tracing::info!("unloading scene {scene} of mod {id}");

        let shared = self.shared.clone();
        let host = self.host.clone();
        let scene = scene.to_string();
        self.runtime.spawn_blocking(move || {
            let result = host.unload_scene(&unit, &scene);
            shared
                .dispatcher
                .enqueue(move |core: &mut Core| core.finish_scene_unload(unit, scene, result));
        });
        true
    }

    fn finish_scene_unload(&mut self, unit: Arc<Mod>, scene: String, result: Result<()>) {
        if let Err(err) = result {
            tracing::warn!("scene {scene} of mod {} failed to unload: {err:#}", unit.id());
        }
        self.emit(ModEvent::SceneUnloaded {
            mod_id: unit.id().to_string(),
            scene,
        });
    }

    fn set_refresh_interval(&mut self, interval: Option<Duration>) {
        // Cancel the existing timer first so two can never overlap.
        if let Some(stop) = self.refresh_timer.take() {
            let _ = stop.send(true);
        }
        if self.disposed {
            return;
        }

        let Some(interval) = interval.filter(|value| !value.is_zero()) else {
            tracing::debug!("automatic refresh disabled");
            return;
        };

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let shared = self.shared.clone();
        self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately;
            // registration already triggered a scan, so skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // Coalesce if the consumer has not drained the
                        // previous tick yet.
                        shared
                            .dispatcher
                            .enqueue_keyed("auto-refresh", |core: &mut Core| core.refresh_all());
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        self.refresh_timer = Some(stop_tx);
        tracing::info!("automatic refresh every {:?}", interval);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        if let Some(stop) = self.refresh_timer.take() {
            let _ = stop.send(true);
        }

        for cancel in self.active_loads.values() {
            let _ = cancel.send(true);
        }
        for cancel in self.scene_loads.values() {
            let _ = cancel.send(true);
        }
        self.active_loads.clear();
        self.scene_loads.clear();
        self.pending_removals.clear();

        let units: Vec<Arc<Mod>> = self.mods.values().cloned().collect();
        for unit in &units {
            if unit.state() == LoadState::Loaded {
                if let Some(scenes) = self.loaded_scenes.shift_remove(unit.id()) {
                    for scene in scenes {
                        if let Err(err) = self.host.unload_scene(unit, &scene) {
                            tracing::warn!(
                                "scene {scene} of mod {} failed to unload during teardown: {err:#}",
                                unit.id()
                            );
                        }
                        self.emit(ModEvent::SceneUnloaded {
                            mod_id: unit.id().to_string(),
                            scene,
                        });
                    }
                }
                if let Err(err) = self.host.unload(unit) {
                    tracing::warn!(
                        "mod {} failed to unload during teardown: {err:#}",
                        unit.id()
                    );
                }
                self.emit(ModEvent::ModUnloaded(unit.id().to_string()));
            }
            unit.set_state(LoadState::Invalid);
        }
        self.mods.clear();
        self.loaded_scenes.clear();
        self.shared.path_index.lock().unwrap().clear();
        self.shared.dispatcher.clear();

        for watcher in self.watchers.values() {
            watcher.dispose();
        }
        self.watchers.clear();

        if !units.is_empty() {
            self.emit(ModEvent::ModsChanged);
        }
        tracing::info!("mod manager disposed");
    }
}

fn canonicalize(path: &Utf8Path) -> Result<Utf8PathBuf> {
    let canonical = fs::canonicalize(path.as_std_path())
        .with_context(|| format!("failed to resolve search directory {path}"))?;
    Utf8PathBuf::from_path_buf(canonical)
        .map_err(|raw| anyhow::anyhow!("search directory {} is not valid UTF-8", raw.display()))
}

fn check_supported(parsed: &ModManifest, settings: &HostSettings) -> Result<(), ManifestError> {
    if !parsed.supports_platform(&settings.platform) {
        return Err(ManifestError::UnsupportedPlatform {
            id: parsed.id.clone(),
            platform: settings.platform.clone(),
        });
    }
    if !parsed
        .content_type()
        .intersects(&settings.supported_content_type())
    {
        return Err(ManifestError::UnsupportedContent {
            id: parsed.id.clone(),
        });
    }
    Ok(())
}
