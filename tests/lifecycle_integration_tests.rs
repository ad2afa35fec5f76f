//! Integration tests for the mod load-state machine
//!
//! Covers the asynchronous load/unload flows, cooperative cancellation,
//! scene lifecycles, the deferred-removal policy for busy mods, and
//! manager teardown. Hosts are hand-rolled stubs so the tests control
//! exactly when payload work settles.

use camino::{Utf8Path, Utf8PathBuf};
use modhost::{CancelSignal, HostSettings, LoadState, Mod, ModEvent, ModHost, ModManager, NullHost};
use std::fs;
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::broadcast;

fn utf8_root(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().canonicalize().unwrap()).unwrap()
}

fn write_dir_mod(root: &Utf8Path, name: &str, raw: &str) {
    let dir = root.join(name);
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("mod.json"), raw).unwrap();
}

fn manager_with(host: Arc<dyn ModHost>) -> ModManager {
    ModManager::new(
        host,
        HostSettings::default(),
        tokio::runtime::Handle::current(),
    )
}

async fn pump_until<F>(manager: &mut ModManager, mut done: F)
where
    F: FnMut(&ModManager) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        manager.update();
        if done(manager) {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for condition"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn drain_events(rx: &mut broadcast::Receiver<ModEvent>) -> Vec<ModEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Host whose load spins until cancelled or the hold expires.
struct SlowLoadHost {
    hold: Duration,
}

impl ModHost for SlowLoadHost {
    fn load(&self, _unit: &Mod, cancel: &CancelSignal) -> anyhow::Result<()> {
        let deadline = Instant::now() + self.hold;
        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }

    fn unload(&self, _unit: &Mod) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Host whose unload blocks until the test releases it.
struct GatedUnloadHost {
    gate: Mutex<Option<mpsc::Receiver<()>>>,
}

impl ModHost for GatedUnloadHost {
    fn load(&self, _unit: &Mod, _cancel: &CancelSignal) -> anyhow::Result<()> {
        Ok(())
    }

    fn unload(&self, _unit: &Mod) -> anyhow::Result<()> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(release) = gate {
            let _ = release.recv();
        }
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_load_and_unload_lifecycle() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    write_dir_mod(&root, "mod_a", r#"{"id": "a"}"#);

    let mut manager = manager_with(Arc::new(NullHost));
    manager.add_search_directory(&root).unwrap();
    pump_until(&mut manager, |m| m.get("a").is_some()).await;

    let mut events = manager.subscribe();
    assert!(manager.request_load("a"));
    assert_eq!(manager.get("a").unwrap().state(), LoadState::Loading);
    // A second request while loading is not applicable.
    assert!(!manager.request_load("a"));

    pump_until(&mut manager, |m| {
        m.get("a").is_some_and(|a| a.state() == LoadState::Loaded)
    })
    .await;

    assert!(manager.request_unload("a"));
    pump_until(&mut manager, |m| {
        m.get("a").is_some_and(|a| a.state() == LoadState::Unloaded)
    })
    .await;

    let events = drain_events(&mut events);
    let loaded = events
        .iter()
        .position(|e| *e == ModEvent::ModLoaded("a".to_string()))
        .expect("ModLoaded fired");
    let unloaded = events
        .iter()
        .position(|e| *e == ModEvent::ModUnloaded("a".to_string()))
        .expect("ModUnloaded fired");
    assert!(loaded < unloaded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelling_an_in_flight_load() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    write_dir_mod(&root, "mod_a", r#"{"id": "a"}"#);

    let mut manager = manager_with(Arc::new(SlowLoadHost {
        hold: Duration::from_secs(30),
    }));
    manager.add_search_directory(&root).unwrap();
    pump_until(&mut manager, |m| m.get("a").is_some()).await;

    let mut events = manager.subscribe();
    assert!(manager.request_load("a"));
    assert!(manager.request_unload("a"), "unload of a loading mod cancels");

    pump_until(&mut manager, |m| {
        m.get("a").is_some_and(|a| a.state() == LoadState::Unloaded)
    })
    .await;

    let events = drain_events(&mut events);
    assert!(events.contains(&ModEvent::ModLoadCancelled("a".to_string())));
    assert!(!events.contains(&ModEvent::ModLoaded("a".to_string())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_removal_during_unload_is_deferred() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    write_dir_mod(&root, "mod_c", r#"{"id": "c"}"#);

    let (release, gate) = mpsc::channel();
    let mut manager = manager_with(Arc::new(GatedUnloadHost {
        gate: Mutex::new(Some(gate)),
    }));
    manager.add_search_directory(&root).unwrap();
    pump_until(&mut manager, |m| m.get("c").is_some()).await;

    manager.request_load("c");
    pump_until(&mut manager, |m| {
        m.get("c").is_some_and(|c| c.state() == LoadState::Loaded)
    })
    .await;

    let mut events = manager.subscribe();
    assert!(manager.request_unload("c"));

    // The path disappears while the unload is still blocked in the host.
    fs::remove_dir_all(root.join("mod_c")).unwrap();
    manager.refresh_search_directories();

    // The mod must survive until the unload settles.
    for _ in 0..20 {
        manager.update();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(manager.get("c").is_some(), "busy mod is not removed");
    let premature = drain_events(&mut events);
    assert!(
        !premature
            .iter()
            .any(|e| matches!(e, ModEvent::ModRemoved(_))),
        "no removal before the unload completes"
    );

    release.send(()).unwrap();
    pump_until(&mut manager, |m| m.get("c").is_none()).await;

    let events = drain_events(&mut events);
    let unloaded = events
        .iter()
        .position(|e| *e == ModEvent::ModUnloaded("c".to_string()))
        .expect("ModUnloaded fired");
    let removed = events
        .iter()
        .position(|e| *e == ModEvent::ModRemoved("c".to_string()))
        .expect("ModRemoved fired");
    assert!(unloaded < removed, "removal finalizes after the unload");
    assert_eq!(
        events
            .iter()
            .filter(|e| **e == ModEvent::ModRemoved("c".to_string()))
            .count(),
        1,
        "removed exactly once"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_removal_during_load_cancels_and_removes() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    write_dir_mod(&root, "mod_a", r#"{"id": "a"}"#);

    let mut manager = manager_with(Arc::new(SlowLoadHost {
        hold: Duration::from_secs(30),
    }));
    manager.add_search_directory(&root).unwrap();
    pump_until(&mut manager, |m| m.get("a").is_some()).await;

    let mut events = manager.subscribe();
    assert!(manager.request_load("a"));
    assert_eq!(manager.get("a").unwrap().state(), LoadState::Loading);

    // The path disappears mid-load; the deferral cancels the load and the
    // removal finalizes once the cancellation settles.
    fs::remove_dir_all(root.join("mod_a")).unwrap();
    manager.refresh_search_directories();
    pump_until(&mut manager, |m| m.get("a").is_none()).await;

    let events = drain_events(&mut events);
    let cancelled = events
        .iter()
        .position(|e| *e == ModEvent::ModLoadCancelled("a".to_string()))
        .expect("ModLoadCancelled fired");
    let removed = events
        .iter()
        .position(|e| *e == ModEvent::ModRemoved("a".to_string()))
        .expect("ModRemoved fired");
    assert!(cancelled < removed);
    assert!(!events.contains(&ModEvent::ModLoaded("a".to_string())));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scene_lifecycle() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    write_dir_mod(
        &root,
        "world",
        r#"{"id": "world", "content": ["scenes"], "scenes": ["Main", "Arena"]}"#,
    );

    let mut manager = manager_with(Arc::new(NullHost));
    manager.add_search_directory(&root).unwrap();
    pump_until(&mut manager, |m| m.get("world").is_some()).await;

    let mut events = manager.subscribe();

    // Scenes require a loaded mod.
    assert!(!manager.load_scene("world", "Main"));

    manager.request_load("world");
    pump_until(&mut manager, |m| {
        m.get("world").is_some_and(|w| w.state() == LoadState::Loaded)
    })
    .await;

    assert!(manager.load_scene("world", "Main"));
    assert!(!manager.load_scene("world", "Nowhere"), "undeclared scene");

    let mut seen = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while !seen.contains(&ModEvent::SceneLoaded {
        mod_id: "world".to_string(),
        scene: "Main".to_string(),
    }) {
        manager.update();
        seen.extend(drain_events(&mut events));
        assert!(Instant::now() < deadline, "timed out waiting for scene load");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // Unloading the mod sweeps its scene bookkeeping along.
    manager.request_unload("world");
    pump_until(&mut manager, |m| {
        m.get("world").is_some_and(|w| w.state() == LoadState::Unloaded)
    })
    .await;

    seen.extend(drain_events(&mut events));
    let scene_unloaded = seen
        .iter()
        .position(|e| {
            *e == ModEvent::SceneUnloaded {
                mod_id: "world".to_string(),
                scene: "Main".to_string(),
            }
        })
        .expect("SceneUnloaded fired");
    let mod_unloaded = seen
        .iter()
        .position(|e| *e == ModEvent::ModUnloaded("world".to_string()))
        .expect("ModUnloaded fired");
    assert!(scene_unloaded < mod_unloaded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_automatic_refresh_discovers_new_mods() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);

    let mut manager = manager_with(Arc::new(NullHost));
    manager.add_search_directory(&root).unwrap();

    // Restarting the timer must cancel the previous one cleanly.
    manager.set_refresh_interval(Some(Duration::from_millis(50)));
    manager.set_refresh_interval(Some(Duration::from_millis(30)));

    write_dir_mod(&root, "late", r#"{"id": "late"}"#);
    pump_until(&mut manager, |m| m.get("late").is_some()).await;

    manager.set_refresh_interval(None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispose_unloads_and_clears_everything() {
    let temp = TempDir::new().unwrap();
    let root = utf8_root(&temp);
    write_dir_mod(&root, "mod_a", r#"{"id": "a"}"#);

    let mut manager = manager_with(Arc::new(NullHost));
    manager.add_search_directory(&root).unwrap();
    pump_until(&mut manager, |m| m.get("a").is_some()).await;

    manager.request_load("a");
    pump_until(&mut manager, |m| {
        m.get("a").is_some_and(|a| a.state() == LoadState::Loaded)
    })
    .await;

    let mut events = manager.subscribe();
    manager.dispose();
    manager.dispose(); // idempotent

    assert!(manager.mods().is_empty());
    assert!(manager.get("a").is_none());
    assert!(manager.search_directories().is_empty());
    assert!(manager.add_search_directory(&root).is_err());

    let events = drain_events(&mut events);
    assert!(events.contains(&ModEvent::ModUnloaded("a".to_string())));
}
