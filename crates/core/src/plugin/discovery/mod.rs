//! Built-in discovery plugins
//!
//! Most languages are found by extension or file name, which
//! [`ExtensionDiscovery`] covers with a list of [`SourceRule`]s. Scripts
//! without an extension are matched by their shebang line.

mod java;

pub use java::JavaDiscovery;

use super::{DiscoveryPlugin, PluginDescriptor};
use crate::config::DiscoveryDecl;
use crate::error::{ConfigError, PluginError};
use crate::exceptions::Exceptions;
use crate::package::SourceSink;
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

static SHELL_SHEBANG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#!\s*\S*/(?:env\s+)?(?:sh|bash|zsh|ksh|dash|mksh|csh|tcsh)\b").unwrap()
});

static PYTHON_SHEBANG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#!\s*\S*/(?:env\s+)?python[0-9.]*\b").unwrap());

/// Bytes read from the head of a file when looking for a shebang.
const SHEBANG_PROBE: u64 = 256;

/// Which files go under one tag.
#[derive(Debug, Clone)]
pub struct SourceRule {
    pub tag: String,
    /// Extensions with leading dot, compared case-sensitively
    pub extensions: Vec<String>,
    /// Exact file names
    pub filenames: Vec<String>,
    /// File name prefixes (e.g. `Dockerfile.` for `Dockerfile.dev`)
    pub prefixes: Vec<String>,
    /// Interpreter line for files no other criterion matched
    pub shebang: Option<&'static Regex>,
}

impl SourceRule {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            extensions: Vec::new(),
            filenames: Vec::new(),
            prefixes: Vec::new(),
            shebang: None,
        }
    }

    pub fn extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn filenames(mut self, filenames: &[&str]) -> Self {
        self.filenames = filenames.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn prefixes(mut self, prefixes: &[&str]) -> Self {
        self.prefixes = prefixes.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn shebang(mut self, shebang: &'static Regex) -> Self {
        self.shebang = Some(shebang);
        self
    }

    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if self.filenames.iter().any(|f| f == name)
            || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
            || self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
        {
            return true;
        }
        match self.shebang {
            // Only extensionless files are probed, everything else was decided above.
            Some(re) if path.extension().is_none() => {
                read_first_line(path).is_some_and(|line| re.is_match(&line))
            }
            _ => false,
        }
    }
}

/// Discovery plugin that sorts package files into tags by name.
pub struct ExtensionDiscovery {
    descriptor: PluginDescriptor,
    rules: Vec<SourceRule>,
}

impl ExtensionDiscovery {
    pub fn new(name: &str, rules: Vec<SourceRule>) -> Self {
        let produces: Vec<&str> = rules.iter().map(|r| r.tag.as_str()).collect();
        Self {
            descriptor: PluginDescriptor::discovery(name, &produces, &[]),
            rules,
        }
    }

    /// Build a plugin from a `[[discovery]]` config entry.
    pub fn from_decl(decl: &DiscoveryDecl) -> Result<Self, ConfigError> {
        if decl.extensions.is_empty() && decl.filenames.is_empty() {
            return Err(ConfigError::InvalidPlugin {
                name: decl.name.clone(),
                reason: "needs at least one of `extensions` or `filenames`".to_string(),
            });
        }
        let mut rule = SourceRule::new(&decl.tag);
        rule.extensions = decl.extensions.clone();
        rule.filenames = decl.filenames.clone();
        let mut plugin = Self::new(&decl.name, vec![rule]);
        plugin.descriptor.requires = decl.requires.clone();
        Ok(plugin)
    }
}

impl DiscoveryPlugin for ExtensionDiscovery {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn scan(
        &self,
        sink: &mut SourceSink<'_>,
        _level: &str,
        exceptions: &Exceptions,
    ) -> Result<(), PluginError> {
        for rule in &self.rules {
            let matched: Vec<PathBuf> = sink
                .package()
                .files()
                .iter()
                .filter(|p| !exceptions.is_path_excluded(p) && rule.matches(p))
                .cloned()
                .collect();
            sink.add(&rule.tag, matched)?;
        }
        Ok(())
    }
}

/// Every discovery plugin shipped with lintmux.
pub fn builtins() -> Vec<Arc<dyn DiscoveryPlugin>> {
    vec![
        Arc::new(ExtensionDiscovery::new(
            "shell",
            vec![SourceRule::new("shell_src")
                .extensions(&[".sh", ".bash", ".zsh", ".ksh", ".dash", ".bats"])
                .shebang(&SHELL_SHEBANG)],
        )),
        Arc::new(ExtensionDiscovery::new(
            "python",
            vec![SourceRule::new("python_src")
                .extensions(&[".py"])
                .shebang(&PYTHON_SHEBANG)],
        )),
        Arc::new(ExtensionDiscovery::new(
            "c",
            vec![
                SourceRule::new("c_src").extensions(&[".c", ".cc", ".cpp", ".cxx"]),
                SourceRule::new("headers").extensions(&[".h", ".hh", ".hpp", ".hxx"]),
            ],
        )),
        Arc::new(ExtensionDiscovery::new(
            "dockerfile",
            vec![SourceRule::new("dockerfile_src")
                .extensions(&[".dockerfile"])
                .filenames(&["Dockerfile", "Containerfile"])
                .prefixes(&["Dockerfile."])],
        )),
        Arc::new(ExtensionDiscovery::new(
            "yaml",
            vec![SourceRule::new("yaml_src").extensions(&[".yaml", ".yml"])],
        )),
        Arc::new(ExtensionDiscovery::new(
            "maven",
            vec![SourceRule::new("poms").filenames(&["pom.xml"])],
        )),
        Arc::new(JavaDiscovery::new()),
    ]
}

fn read_first_line(path: &Path) -> Option<String> {
    let mut head = Vec::new();
    File::open(path)
        .ok()?
        .take(SHEBANG_PROBE)
        .read_to_end(&mut head)
        .ok()?;
    let text = String::from_utf8_lossy(&head);
    text.lines().next().map(String::from)
}
