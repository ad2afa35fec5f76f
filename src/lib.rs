// modhost - runtime mod discovery and lifecycle management
//
// This is the library crate containing the mod-management core. The binary
// crate (main.rs) wraps it in a small watching host for manual use.

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod host;
pub mod logging;
pub mod manager;
pub mod manifest;
pub mod mods;
pub mod resolve;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, HostSettings};
pub use host::{CancelSignal, ModHost, NullHost};
pub use manager::{ModEvent, ModManager};
pub use manifest::{ContentKind, ContentType, ManifestError, ModManifest};
pub use mods::{LoadState, Mod};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
