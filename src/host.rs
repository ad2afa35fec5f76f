// Host runtime integration seam
//
// The manager never executes mod content itself; payload work is delegated
// to a ModHost implementation supplied by the embedding application.

use crate::mods::Mod;
use anyhow::Result;
use tokio::sync::watch;

/// Cooperative cancellation signal handed to long-running host payload
/// work.
///
/// One sender is held by the manager per in-flight operation.
/// Implementations should poll [`is_cancelled`](Self::is_cancelled) at
/// their own suspension points and return promptly once it flips.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub(crate) fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// The embedding application's runtime for mod payloads.
///
/// Methods run on the blocking worker pool and may take arbitrarily long;
/// the manager's consumer context is never blocked on them. On
/// cancellation an implementation must roll back any partially applied
/// work and return `Ok` — the manager reports the cancellation to
/// subscribers itself.
pub trait ModHost: Send + Sync + 'static {
    /// Bring the mod's runtime payload up.
    fn load(&self, unit: &Mod, cancel: &CancelSignal) -> Result<()>;

    /// Tear the mod's runtime payload down, including any scenes it still
    /// has loaded.
    fn unload(&self, unit: &Mod) -> Result<()>;

    /// Load one of the mod's declared scenes.
    fn load_scene(&self, unit: &Mod, scene: &str, cancel: &CancelSignal) -> Result<()> {
        let _ = (unit, scene, cancel);
        Ok(())
    }

    /// Unload a previously loaded scene.
    fn unload_scene(&self, unit: &Mod, scene: &str) -> Result<()> {
        let _ = (unit, scene);
        Ok(())
    }
}

/// No-op host used by tests and the demo binary.
#[derive(Debug, Default)]
pub struct NullHost;

impl ModHost for NullHost {
    fn load(&self, _unit: &Mod, _cancel: &CancelSignal) -> Result<()> {
        Ok(())
    }

    fn unload(&self, _unit: &Mod) -> Result<()> {
        Ok(())
    }
}
