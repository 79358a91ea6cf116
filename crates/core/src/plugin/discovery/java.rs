use crate::error::PluginError;
use crate::exceptions::Exceptions;
use crate::package::SourceSink;
use crate::plugin::{DiscoveryPlugin, PluginDescriptor};
use std::path::PathBuf;

/// Finds Java sources inside each Maven module.
///
/// Consumes the `poms` tag, so it always runs after the Maven plugin: only
/// files under a directory holding a discovered `pom.xml` are recorded.
pub struct JavaDiscovery {
    descriptor: PluginDescriptor,
}

impl JavaDiscovery {
    pub fn new() -> Self {
        Self {
            descriptor: PluginDescriptor::discovery("java", &["java_src"], &["poms"]),
        }
    }
}

impl Default for JavaDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryPlugin for JavaDiscovery {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn scan(
        &self,
        sink: &mut SourceSink<'_>,
        _level: &str,
        exceptions: &Exceptions,
    ) -> Result<(), PluginError> {
        let package = sink.package();
        let module_roots: Vec<PathBuf> = package
            .sources("poms")
            .iter()
            .filter_map(|pom| pom.parent().map(PathBuf::from))
            .collect();
        if module_roots.is_empty() {
            return Ok(());
        }

        let found: Vec<PathBuf> = package
            .files()
            .iter()
            .filter(|p| p.extension().is_some_and(|e| e == "java"))
            .filter(|p| module_roots.iter().any(|root| p.starts_with(root)))
            .filter(|p| !exceptions.is_path_excluded(p))
            .cloned()
            .collect();
        sink.add("java_src", found)?;
        Ok(())
    }
}
