//! Plugin registry and dependency ordering
//!
//! The registry is a pair of name-keyed maps built once per process from the
//! built-in plugins plus any declared in config. Discovery plugins form a
//! dependency graph through their tags: an edge runs from every plugin
//! producing a tag to every plugin requiring it.

use super::discovery::{self, ExtensionDiscovery};
use super::tool::{self, CommandTool};
use super::{DiscoveryPlugin, PluginDescriptor, ToolPlugin};
use crate::config::{LintmuxConfig, ResolvedConfig};
use crate::error::{ConfigError, DependencyCycleError, Error};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, LazyLock, RwLock};
use tracing::debug;

static CACHE: LazyLock<RwLock<Option<Arc<PluginRegistry>>>> = LazyLock::new(|| RwLock::new(None));

/// Descriptors of every registered plugin, by capability.
#[derive(Debug, Clone, Serialize)]
pub struct PluginCatalog {
    pub discovery: Vec<PluginDescriptor>,
    pub tool: Vec<PluginDescriptor>,
}

/// Name-keyed sets of discovery and tool plugins.
///
/// Names are unique across both capabilities.
#[derive(Default)]
pub struct PluginRegistry {
    discovery: BTreeMap<String, Arc<dyn DiscoveryPlugin>>,
    tools: BTreeMap<String, Arc<dyn ToolPlugin>>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding only the built-in plugins.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for plugin in discovery::builtins() {
            registry.discovery.insert(plugin.name().to_string(), plugin);
        }
        for plugin in tool::builtins() {
            registry.tools.insert(plugin.name().to_string(), plugin);
        }
        registry
    }

    /// Built-in plugins plus the `[[discovery]]` and `[[tools]]` entries of
    /// `config`, validated.
    pub fn from_config(config: &LintmuxConfig) -> Result<Self, Error> {
        let mut registry = Self::builtin();
        for decl in &config.discovery {
            registry.register_discovery(Arc::new(ExtensionDiscovery::from_decl(decl)?))?;
        }
        for decl in &config.tools {
            registry.register_tool(Arc::new(CommandTool::from_decl(decl)?))?;
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn register_discovery(&mut self, plugin: Arc<dyn DiscoveryPlugin>) -> Result<(), ConfigError> {
        let name = plugin.name().to_string();
        if self.contains(&name) {
            return Err(ConfigError::DuplicatePlugin(name));
        }
        self.discovery.insert(name, plugin);
        Ok(())
    }

    pub fn register_tool(&mut self, plugin: Arc<dyn ToolPlugin>) -> Result<(), ConfigError> {
        let name = plugin.name().to_string();
        if self.contains(&name) {
            return Err(ConfigError::DuplicatePlugin(name));
        }
        self.tools.insert(name, plugin);
        Ok(())
    }

    /// Check that every required tag has a producer and that the discovery
    /// graph is acyclic.
    pub fn validate(&self) -> Result<(), Error> {
        let produced: HashSet<&str> = self
            .discovery
            .values()
            .flat_map(|p| p.descriptor().produces.iter().map(String::as_str))
            .collect();

        let descriptors = self
            .discovery
            .values()
            .map(|p| p.descriptor())
            .chain(self.tools.values().map(|p| p.descriptor()));
        for descriptor in descriptors {
            for tag in &descriptor.requires {
                if !produced.contains(tag.as_str()) {
                    return Err(ConfigError::UnknownTag {
                        plugin: descriptor.name.clone(),
                        tag: tag.clone(),
                    }
                    .into());
                }
            }
        }

        let all: Vec<&PluginDescriptor> = self.discovery.values().map(|p| p.descriptor()).collect();
        topological_order(&all)?;
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.discovery.contains_key(name) || self.tools.contains_key(name)
    }

    pub fn discovery(&self, name: &str) -> Option<&Arc<dyn DiscoveryPlugin>> {
        self.discovery.get(name)
    }

    pub fn tool(&self, name: &str) -> Option<&Arc<dyn ToolPlugin>> {
        self.tools.get(name)
    }

    /// Tool plugins in name order.
    pub fn tools(&self) -> impl Iterator<Item = &Arc<dyn ToolPlugin>> {
        self.tools.values()
    }

    /// Descriptors of every registered plugin, sorted by name.
    pub fn discover_plugins(&self) -> PluginCatalog {
        PluginCatalog {
            discovery: self.discovery.values().map(|p| p.descriptor().clone()).collect(),
            tool: self.tools.values().map(|p| p.descriptor().clone()).collect(),
        }
    }

    /// The enabled discovery plugins in dependency order.
    ///
    /// Names not registered as discovery plugins are skipped.
    pub fn discovery_order(
        &self,
        enabled: &BTreeSet<String>,
    ) -> Result<Vec<Arc<dyn DiscoveryPlugin>>, DependencyCycleError> {
        let selected: Vec<&PluginDescriptor> = enabled
            .iter()
            .filter_map(|name| self.discovery.get(name))
            .map(|p| p.descriptor())
            .collect();
        Ok(topological_order(&selected)?
            .iter()
            .filter_map(|name| self.discovery.get(name).cloned())
            .collect())
    }

    /// `(plugin, tag)` pairs where an enabled plugin requires a tag that no
    /// enabled discovery plugin produces.
    pub fn unproduced_tags(&self, resolved: &ResolvedConfig) -> Vec<(String, String)> {
        let produced: HashSet<&str> = resolved
            .enabled_discovery
            .iter()
            .filter_map(|name| self.discovery.get(name))
            .flat_map(|p| p.descriptor().produces.iter().map(String::as_str))
            .collect();

        let discovery = resolved
            .enabled_discovery
            .iter()
            .filter_map(|name| self.discovery.get(name))
            .map(|p| p.descriptor());
        let tools = resolved
            .enabled_tools
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|p| p.descriptor());

        discovery
            .chain(tools)
            .flat_map(|d| {
                d.requires
                    .iter()
                    .filter(|tag| !produced.contains(tag.as_str()))
                    .map(|tag| (d.name.clone(), tag.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

/// Order `descriptors` so every producer of a tag precedes its consumers.
///
/// Ties are broken by plugin name, so the order is stable for a given set.
/// Requirements no descriptor in the set produces are ignored, as is a plugin
/// consuming its own output.
pub fn topological_order(
    descriptors: &[&PluginDescriptor],
) -> Result<Vec<String>, DependencyCycleError> {
    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let index: HashMap<&str, NodeIndex> = descriptors
        .iter()
        .map(|d| (d.name.as_str(), graph.add_node(d.name.as_str())))
        .collect();

    for consumer in descriptors {
        for tag in &consumer.requires {
            for producer in descriptors {
                if producer.name != consumer.name && producer.produces.contains(tag) {
                    graph.update_edge(index[producer.name.as_str()], index[consumer.name.as_str()], ());
                }
            }
        }
    }

    if let Some(scc) = tarjan_scc(&graph).into_iter().find(|c| c.len() > 1) {
        let mut members: Vec<String> = scc.iter().map(|&n| graph[n].to_string()).collect();
        members.sort();
        return Err(DependencyCycleError { members });
    }

    // Kahn's algorithm with a name-ordered ready set.
    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
        .collect();
    let mut ready: BTreeSet<&str> = graph
        .node_indices()
        .filter(|n| in_degree[n] == 0)
        .map(|n| graph[n])
        .collect();

    let mut order = Vec::with_capacity(descriptors.len());
    while let Some(name) = ready.pop_first() {
        order.push(name.to_string());
        for next in graph.neighbors_directed(index[name], Direction::Outgoing) {
            if let Some(degree) = in_degree.get_mut(&next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(graph[next]);
                }
            }
        }
    }
    Ok(order)
}

/// The process-wide registry, built from `config` on first use.
///
/// Later calls return the cached registry regardless of `config` until
/// [`invalidate_cache`] is called.
pub fn global(config: &LintmuxConfig) -> Result<Arc<PluginRegistry>, Error> {
    if let Some(registry) = CACHE.read().ok().and_then(|guard| guard.clone()) {
        return Ok(registry);
    }
    let registry = Arc::new(PluginRegistry::from_config(config)?);
    debug!(
        discovery = registry.discovery.len(),
        tools = registry.tools.len(),
        "plugin registry built"
    );
    if let Ok(mut guard) = CACHE.write() {
        *guard = Some(Arc::clone(&registry));
    }
    Ok(registry)
}

/// Drop the cached registry; the next [`global`] call rebuilds it.
pub fn invalidate_cache() {
    if let Ok(mut guard) = CACHE.write() {
        *guard = None;
    }
}
