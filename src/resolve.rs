// Dependency and conflict resolution
//
// Resolution is global: after any insertion or removal the whole collection
// is recomputed. Incremental updates would be cheaper but risk stale edges
// after bursts of changes, and the collection stays small (tens of mods).

use crate::mods::Mod;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Recompute `conflicts`, `dependencies`, and `dependents` for every mod in
/// the collection.
///
/// Duplicate declared ids resolve first-wins in collection order.
/// Unresolved dependency ids are dropped; their absence is observable on the
/// mod's resolved list. The conflict relation is symmetric by construction.
pub fn resolve_collection(mods: &[Arc<Mod>]) {
    // id -> collection index projection, first declaration wins
    let mut by_id: HashMap<&str, usize> = HashMap::new();
    for (idx, unit) in mods.iter().enumerate() {
        by_id.entry(unit.id()).or_insert(idx);
    }

    let mut dependencies: Vec<Vec<String>> = Vec::with_capacity(mods.len());
    let mut dependents: Vec<Vec<String>> = vec![Vec::new(); mods.len()];

    for (idx, unit) in mods.iter().enumerate() {
        let mut resolved = Vec::new();
        let mut seen = HashSet::new();
        for dep_id in &unit.manifest().dependencies {
            if !seen.insert(dep_id.as_str()) {
                continue;
            }
            match by_id.get(dep_id.as_str()) {
                Some(&dep_idx) if dep_idx != idx => {
                    resolved.push(dep_id.clone());
                    dependents[dep_idx].push(unit.id().to_string());
                }
                Some(_) => {
                    tracing::debug!("mod {} declares itself as a dependency", unit.id());
                }
                None => {
                    tracing::debug!("mod {} has unresolved dependency {}", unit.id(), dep_id);
                }
            }
        }
        dependencies.push(resolved);
    }

    let mut conflicts: Vec<Vec<String>> = vec![Vec::new(); mods.len()];
    for a in 0..mods.len() {
        for b in (a + 1)..mods.len() {
            if in_conflict(&mods[a], &mods[b]) {
                conflicts[a].push(mods[b].id().to_string());
                conflicts[b].push(mods[a].id().to_string());
            }
        }
    }

    for (idx, unit) in mods.iter().enumerate() {
        unit.set_relations(
            std::mem::take(&mut conflicts[idx]),
            std::mem::take(&mut dependencies[idx]),
            std::mem::take(&mut dependents[idx]),
        );
    }
}

/// Whether two mods collide over an identity or a provided resource.
pub fn in_conflict(a: &Mod, b: &Mod) -> bool {
    if a.id() == b.id() {
        return true;
    }
    let provided: HashSet<&str> = a.manifest().provides.iter().map(String::as_str).collect();
    b.manifest()
        .provides
        .iter()
        .any(|key| provided.contains(key.as_str()))
}
