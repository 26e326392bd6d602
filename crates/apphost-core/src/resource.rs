//! Resource resolver: maps logical view/asset names to files.
//!
//! Resolution order for `resolve(class, name)`:
//!
//! 1. The explicit registry (default resources, preloaded files).
//! 2. In development mode only, each search root in registration order.
//!
//! Callers substitute their own fallback resource when nothing resolves.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Kind of resource being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// Templates rendered by the view adapter.
    View,
    /// Static files served to clients.
    Asset,
}

impl ResourceClass {
    /// Returns the string name of this class, also the conventional
    /// subdirectory name inside a plugin directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Asset => "asset",
        }
    }

    /// All resource classes.
    pub fn all() -> [ResourceClass; 2] {
        [Self::View, Self::Asset]
    }
}

impl std::fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ordered search roots plus an explicit name registry, per resource class.
#[derive(Debug, Clone, Default)]
pub struct ResourceResolver {
    /// Class → search roots in registration order.
    roots: HashMap<ResourceClass, Vec<PathBuf>>,
    /// Class → logical name → file.
    registry: HashMap<ResourceClass, HashMap<String, PathBuf>>,
    /// Whether unregistered names may be looked up on disk.
    development: bool,
}

impl ResourceResolver {
    /// Creates an empty resolver.
    pub fn new(development: bool) -> Self {
        Self {
            development,
            ..Self::default()
        }
    }

    /// Returns whether filesystem scanning is enabled.
    pub fn is_development(&self) -> bool {
        self.development
    }

    /// Appends a search root. Duplicates are kept.
    pub fn add_root(&mut self, class: ResourceClass, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(class = %class, root = %path.display(), "Search root added");
        self.roots.entry(class).or_default().push(path);
    }

    /// Returns the search roots for a class in registration order.
    pub fn roots(&self, class: ResourceClass) -> &[PathBuf] {
        self.roots.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Maps `name` to `path`, replacing any previous mapping.
    pub fn register(&mut self, class: ResourceClass, name: &str, path: impl Into<PathBuf>) {
        let name = normalize(name).to_string();
        self.registry
            .entry(class)
            .or_default()
            .insert(name, path.into());
    }

    /// Maps `name` to `path` unless the name is already registered.
    ///
    /// Returns whether the mapping was added.
    pub fn register_if_absent(
        &mut self,
        class: ResourceClass,
        name: &str,
        path: impl Into<PathBuf>,
    ) -> bool {
        let entries = self.registry.entry(class).or_default();
        let name = normalize(name);
        if entries.contains_key(name) {
            return false;
        }
        entries.insert(name.to_string(), path.into());
        true
    }

    /// Returns whether `name` is in the explicit registry.
    pub fn is_registered(&self, class: ResourceClass, name: &str) -> bool {
        self.registry
            .get(&class)
            .is_some_and(|entries| entries.contains_key(normalize(name)))
    }

    /// Resolves a logical name to a file.
    pub fn resolve(&self, class: ResourceClass, name: &str) -> Option<PathBuf> {
        let name = normalize(name);
        if !is_safe_relative(name) {
            warn!(class = %class, name = %name, "Rejected unsafe resource name");
            return None;
        }

        if let Some(path) = self.registry.get(&class).and_then(|e| e.get(name)) {
            return Some(path.clone());
        }

        if self.development {
            for root in self.roots(class) {
                let candidate = root.join(name);
                if candidate.is_file() {
                    debug!(class = %class, name = %name, path = %candidate.display(), "Resource found on disk");
                    return Some(candidate);
                }
            }
        }

        debug!(class = %class, name = %name, "Resource not resolved");
        None
    }

    /// Registers every file found under the roots of `class`.
    ///
    /// Names already registered are kept, and earlier roots win over later
    /// ones, matching development-mode resolution order. Returns the number
    /// of names added.
    pub fn preload(&mut self, class: ResourceClass) -> usize {
        let mut found = Vec::new();
        for root in self.roots(class) {
            collect_files(root, &mut found);
        }

        let mut added = 0;
        for (name, path) in found {
            if self.register_if_absent(class, &name, path) {
                added += 1;
            }
        }

        info!(class = %class, added = added, "Resources preloaded");
        added
    }
}

fn normalize(name: &str) -> &str {
    name.trim_start_matches('/')
}

fn is_safe_relative(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn collect_files(root: &Path, out: &mut Vec<(String, PathBuf)>) {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            if entry.path_is_symlink() {
                debug!(path = %entry.path().display(), "Skipping symlink");
            }
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        out.push((name, entry.into_path()));
    }
}
