//! Packages: one scanned project and its tagged source inventory
//!
//! File walking uses the `ignore` crate (from ripgrep) so `.gitignore`,
//! `.ignore`, and `.git/info/exclude` are respected. Walk results are sorted,
//! which keeps every discovery plugin deterministic for a fixed tree.

use crate::error::{Error, PluginError};
use crate::exceptions::Exceptions;
use ignore::WalkBuilder;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Manifest file → package type, in detection precedence order.
const PACKAGE_MANIFESTS: &[(&str, &str)] = &[
    ("package.xml", "ros"),
    ("Cargo.toml", "cargo"),
    ("pom.xml", "maven"),
    ("pyproject.toml", "python"),
    ("setup.py", "python"),
    ("package.json", "npm"),
    ("go.mod", "go"),
    ("CMakeLists.txt", "cmake"),
];

/// One scanned project/module.
///
/// Discovery plugins append to the tagged source lists (through a
/// [`SourceSink`]); tool plugins only read them.
#[derive(Debug)]
pub struct Package {
    pub name: String,
    pub path: PathBuf,
    pub package_type: Option<String>,
    sources: BTreeMap<String, Vec<PathBuf>>,
    seen: BTreeMap<String, HashSet<PathBuf>>,
    files: OnceLock<Vec<PathBuf>>,
}

impl Package {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let package_type = detect_package_type(&path).map(str::to_string);
        Self {
            name: name.into(),
            path,
            package_type,
            sources: BTreeMap::new(),
            seen: BTreeMap::new(),
            files: OnceLock::new(),
        }
    }

    /// Open a package rooted at `path`, named after its directory.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let root = path.canonicalize()?;
        if !root.is_dir() {
            return Err(Error::NotADirectory(root));
        }
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Ok(Self::new(name, root))
    }

    /// Override the detected package type.
    pub fn with_package_type(mut self, package_type: Option<String>) -> Self {
        self.package_type = package_type;
        self
    }

    /// Append paths under `tag`, skipping ones already recorded for that tag.
    ///
    /// Relative paths are resolved against the package root. Returns how many
    /// paths were actually added.
    pub fn add_sources<I>(&mut self, tag: &str, paths: I) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let list = self.sources.entry(tag.to_string()).or_default();
        let seen = self.seen.entry(tag.to_string()).or_default();
        let mut added = 0;
        for path in paths {
            let path = if path.is_absolute() {
                path
            } else {
                self.path.join(path)
            };
            if seen.insert(path.clone()) {
                list.push(path);
                added += 1;
            }
        }
        added
    }

    /// Sources recorded under `tag`, in insertion order.
    pub fn sources(&self, tag: &str) -> &[PathBuf] {
        self.sources.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_sources(&self, tag: &str) -> bool {
        !self.sources(tag).is_empty()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Number of distinct files across all tags.
    pub fn source_count(&self) -> usize {
        self.sources
            .values()
            .flatten()
            .collect::<HashSet<_>>()
            .len()
    }

    /// Every file under the package root, sorted, computed once.
    pub fn files(&self) -> &[PathBuf] {
        self.files.get_or_init(|| walk_files(&self.path))
    }
}

/// Write handle given to a discovery plugin.
///
/// Only the tags the plugin declared are writable, and paths excluded by the
/// run's exceptions are dropped before they reach the package.
pub struct SourceSink<'a> {
    package: &'a mut Package,
    plugin: &'a str,
    produces: &'a [String],
    exceptions: &'a Exceptions,
}

impl<'a> SourceSink<'a> {
    pub fn new(
        package: &'a mut Package,
        plugin: &'a str,
        produces: &'a [String],
        exceptions: &'a Exceptions,
    ) -> Self {
        Self {
            package,
            plugin,
            produces,
            exceptions,
        }
    }

    pub fn package(&self) -> &Package {
        self.package
    }

    pub fn add<I>(&mut self, tag: &str, paths: I) -> Result<usize, PluginError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        if !self.produces.iter().any(|t| t == tag) {
            return Err(PluginError::UndeclaredTag {
                plugin: self.plugin.to_string(),
                tag: tag.to_string(),
            });
        }
        let exceptions = self.exceptions;
        let kept: Vec<PathBuf> = paths
            .into_iter()
            .filter(|p| !exceptions.is_path_excluded(p))
            .collect();
        Ok(self.package.add_sources(tag, kept))
    }
}

/// Detect a package type from the manifest files present in `dir`.
pub fn detect_package_type(dir: &Path) -> Option<&'static str> {
    PACKAGE_MANIFESTS
        .iter()
        .find(|(manifest, _)| dir.join(manifest).is_file())
        .map(|(_, kind)| *kind)
}

/// Find package roots below `root`: directories holding a recognized manifest.
///
/// Packages nested inside another package are not reported separately.
/// Returns absolute paths sorted alphabetically.
pub fn find_packages(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let root = root.canonicalize()?;
    let mut builder = WalkBuilder::new(&root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true);

    let mut dirs: Vec<PathBuf> = builder
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_dir()))
        .map(|entry| entry.into_path())
        .filter(|dir| detect_package_type(dir).is_some())
        .collect();
    dirs.sort();

    let mut packages: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        if !packages.iter().any(|p| dir.starts_with(p)) {
            packages.push(dir);
        }
    }
    Ok(packages)
}

fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true) // skip hidden files/dirs
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue, // skip unreadable entries
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.into_path();
        if path.is_absolute() {
            files.push(path);
        } else {
            files.push(root.join(path));
        }
    }

    files.sort();
    files
}
