// Mod manifest parsing
//
// A candidate path is either a directory containing `mod.json` or a
// standalone `<name>.mod.json` file. Parsing never touches the shared mod
// collection; it is safe to run on any worker thread.

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::LazyLock;
use thiserror::Error;

/// File name looked up inside a candidate mod directory.
pub const MANIFEST_FILE: &str = "mod.json";

/// Suffix marking a standalone manifest candidate.
pub const MANIFEST_SUFFIX: &str = ".mod.json";

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("invalid id pattern"));

/// Errors raised while constructing a mod from a candidate path.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("not a recognized mod layout: {0}")]
    Unrecognized(Utf8PathBuf),

    #[error("manifest not found at {0}")]
    Missing(Utf8PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid mod id {0:?}")]
    InvalidId(String),

    #[error("mod {id} does not support platform {platform}")]
    UnsupportedPlatform { id: String, platform: String },

    #[error("mod {id} ships no content this host manages")]
    UnsupportedContent { id: String },
}

/// Content classification a manifest may declare.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Code,
    Assets,
    Scenes,
}

/// Flag set describing what a mod ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentType {
    pub code: bool,
    pub assets: bool,
    pub scenes: bool,
}

impl ContentType {
    /// Collapse declared kinds into flags. An empty declaration counts as
    /// plain assets.
    pub fn from_kinds(kinds: &[ContentKind]) -> Self {
        if kinds.is_empty() {
            return Self {
                assets: true,
                ..Self::default()
            };
        }
        let mut content = Self::default();
        for kind in kinds {
            match kind {
                ContentKind::Code => content.code = true,
                ContentKind::Assets => content.assets = true,
                ContentKind::Scenes => content.scenes = true,
            }
        }
        content
    }

    pub fn intersects(&self, other: &ContentType) -> bool {
        (self.code && other.code) || (self.assets && other.assets) || (self.scenes && other.scenes)
    }

    /// Human-readable label, e.g. "Code+Scenes".
    pub fn describe(&self) -> String {
        let mut kinds = Vec::new();
        if self.code {
            kinds.push("Code");
        }
        if self.assets {
            kinds.push("Assets");
        }
        if self.scenes {
            kinds.push("Scenes");
        }

        if kinds.is_empty() {
            "Empty".to_string()
        } else {
            kinds.join("+")
        }
    }
}

/// Metadata declared by a mod package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModManifest {
    /// Stable identity other mods reference in their dependency lists.
    pub id: String,

    /// Declared content kinds; empty defaults to assets.
    #[serde(default)]
    pub content: Vec<ContentKind>,

    /// Ids of mods this one requires, in load-significant order.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Managed resource keys this mod claims; overlaps are conflicts.
    #[serde(default)]
    pub provides: Vec<String>,

    /// Loadable scene names for mods shipping scene content.
    #[serde(default)]
    pub scenes: Vec<String>,

    /// Platform allowlist; empty means every platform.
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl ModManifest {
    pub fn content_type(&self) -> ContentType {
        ContentType::from_kinds(&self.content)
    }

    pub fn supports_platform(&self, platform: &str) -> bool {
        self.platforms.is_empty() || self.platforms.iter().any(|p| p == platform)
    }
}

/// Whether a directory entry is worth diffing as a mod candidate.
pub fn is_candidate(path: &Utf8Path) -> bool {
    path.is_dir() || path.as_str().ends_with(MANIFEST_SUFFIX)
}

/// Locate the manifest file for a candidate path.
pub fn manifest_location(candidate: &Utf8Path) -> Result<Utf8PathBuf, ManifestError> {
    if candidate.is_dir() {
        let manifest = candidate.join(MANIFEST_FILE);
        if manifest.is_file() {
            Ok(manifest)
        } else {
            Err(ManifestError::Missing(manifest))
        }
    } else if candidate.as_str().ends_with(MANIFEST_SUFFIX) && candidate.is_file() {
        Ok(candidate.to_path_buf())
    } else {
        Err(ManifestError::Unrecognized(candidate.to_path_buf()))
    }
}

/// Parse and validate the manifest for a candidate mod path.
pub fn parse_manifest(candidate: &Utf8Path) -> Result<ModManifest, ManifestError> {
    let manifest_path = manifest_location(candidate)?;

    let raw = fs::read_to_string(&manifest_path).map_err(|source| ManifestError::Io {
        path: manifest_path.clone(),
        source,
    })?;

    let manifest: ModManifest =
        serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
            path: manifest_path.clone(),
            source,
        })?;

    if !ID_PATTERN.is_match(&manifest.id) {
        return Err(ManifestError::InvalidId(manifest.id));
    }

    Ok(manifest)
}

/// Display name derived from the candidate path.
pub fn mod_name(candidate: &Utf8Path) -> String {
    let stem = candidate.file_stem().unwrap_or(candidate.as_str());
    stem.strip_suffix(".mod").unwrap_or(stem).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn utf8_path(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
    }

    fn write_manifest(dir: &Utf8Path, raw: &str) {
        let mut file = std::fs::File::create(dir.join(MANIFEST_FILE)).unwrap();
        file.write_all(raw.as_bytes()).unwrap();
    }

    #[test]
    fn test_parse_directory_candidate() {
        let temp = TempDir::new().unwrap();
        let root = utf8_path(&temp);
        let candidate = root.join("atmosphere");
        std::fs::create_dir(&candidate).unwrap();
        write_manifest(
            &candidate,
            r#"{"id": "atmosphere", "content": ["code", "scenes"], "dependencies": ["core-lib"], "scenes": ["Sky"]}"#,
        );

        let manifest = parse_manifest(&candidate).unwrap();
        assert_eq!(manifest.id, "atmosphere");
        assert_eq!(manifest.dependencies, vec!["core-lib".to_string()]);
        assert_eq!(manifest.scenes, vec!["Sky".to_string()]);
        assert!(manifest.content_type().code);
        assert!(manifest.content_type().scenes);
        assert!(!manifest.content_type().assets);
    }

    #[test]
    fn test_parse_standalone_candidate() {
        let temp = TempDir::new().unwrap();
        let root = utf8_path(&temp);
        let candidate = root.join("tiny.mod.json");
        std::fs::write(&candidate, r#"{"id": "tiny"}"#).unwrap();

        let manifest = parse_manifest(&candidate).unwrap();
        assert_eq!(manifest.id, "tiny");
        // An empty content list defaults to assets.
        assert!(manifest.content_type().assets);
    }

    #[test]
    fn test_missing_manifest_is_an_error() {
        let temp = TempDir::new().unwrap();
        let root = utf8_path(&temp);
        let candidate = root.join("empty");
        std::fs::create_dir(&candidate).unwrap();

        assert!(matches!(
            parse_manifest(&candidate),
            Err(ManifestError::Missing(_))
        ));
    }

    #[test]
    fn test_unrecognized_layout_is_an_error() {
        let temp = TempDir::new().unwrap();
        let root = utf8_path(&temp);
        let candidate = root.join("readme.txt");
        std::fs::write(&candidate, "hello").unwrap();

        assert!(matches!(
            parse_manifest(&candidate),
            Err(ManifestError::Unrecognized(_))
        ));
        assert!(!is_candidate(&candidate));
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        let temp = TempDir::new().unwrap();
        let root = utf8_path(&temp);
        let candidate = root.join("bad.mod.json");
        std::fs::write(&candidate, r#"{"id": "no spaces allowed"}"#).unwrap();

        assert!(matches!(
            parse_manifest(&candidate),
            Err(ManifestError::InvalidId(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        let root = utf8_path(&temp);
        let candidate = root.join("broken.mod.json");
        std::fs::write(&candidate, "{not json").unwrap();

        assert!(matches!(
            parse_manifest(&candidate),
            Err(ManifestError::Parse { .. })
        ));
    }

    #[test]
    fn test_mod_name_derivation() {
        assert_eq!(mod_name(Utf8Path::new("/mods/atmosphere")), "atmosphere");
        assert_eq!(mod_name(Utf8Path::new("/mods/tiny.mod.json")), "tiny");
    }

    #[test]
    fn test_platform_allowlist() {
        let manifest = ModManifest {
            id: "p".to_string(),
            content: Vec::new(),
            dependencies: Vec::new(),
            provides: Vec::new(),
            scenes: Vec::new(),
            platforms: vec!["linux".to_string()],
        };

        assert!(manifest.supports_platform("linux"));
        assert!(!manifest.supports_platform("windows"));
    }

    #[test]
    fn test_content_type_describe() {
        let content = ContentType::from_kinds(&[ContentKind::Code, ContentKind::Assets]);
        assert_eq!(content.describe(), "Code+Assets");
        assert_eq!(ContentType::default().describe(), "Empty");
    }
}
