//! The agent registry.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing::warn;

use crate::definition::AgentDefinition;
use crate::error::Result;
use crate::error::registry_error;
use crate::loader::load_definitions_dir;

/// An immutable collection of agent definitions.
///
/// Built once before any run starts and shared read-only across concurrent
/// runs, so lookups never contend.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<AgentDefinition>>,
    default_namespace: Option<String>,
}

impl AgentRegistry {
    /// Start building a registry.
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::new()
    }

    /// Resolve an agent ID to its definition.
    ///
    /// Resolution tries the ID as given first. When that misses, the ID has
    /// no namespace qualifier, and a default namespace is configured, it
    /// retries as `{default_namespace}/{id}`.
    pub fn resolve(&self, agent_id: &str) -> Result<Arc<AgentDefinition>> {
        if let Some(def) = self.agents.get(agent_id) {
            return Ok(Arc::clone(def));
        }

        if !agent_id.contains('/') {
            if let Some(ns) = &self.default_namespace {
                let qualified = format!("{ns}/{agent_id}");
                if let Some(def) = self.agents.get(&qualified) {
                    return Ok(Arc::clone(def));
                }
            }
        }

        Err(registry_error::UnknownAgentSnafu {
            agent_id: agent_id.to_string(),
        }
        .build())
    }

    /// Check whether an ID resolves, via exact match or namespace fallback.
    pub fn contains(&self, agent_id: &str) -> bool {
        self.resolve(agent_id).is_ok()
    }

    /// All registered agent IDs, sorted.
    pub fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The configured default namespace, if any.
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }
}

/// Builder for [`AgentRegistry`].
///
/// Definitions are collected first and checked together in [`build`], so a
/// batch of registrations reports duplicates no matter the order they were
/// added in.
///
/// [`build`]: AgentRegistryBuilder::build
#[derive(Debug, Default)]
pub struct AgentRegistryBuilder {
    definitions: Vec<AgentDefinition>,
    default_namespace: Option<String>,
}

impl AgentRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace used for unqualified ID fallback.
    pub fn default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = Some(namespace.into());
        self
    }

    /// Add a definition.
    pub fn register(mut self, definition: AgentDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Load every valid `*.toml` definition from a directory.
    ///
    /// Files that fail to parse or validate are skipped with a warning, so
    /// one bad file cannot take down the rest of the registry.
    pub fn load_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.definitions.extend(load_definitions_dir(dir.as_ref()));
        self
    }

    /// Validate all definitions and build the registry.
    pub fn build(self) -> Result<AgentRegistry> {
        let mut agents = HashMap::with_capacity(self.definitions.len());

        for definition in self.definitions {
            definition.validate()?;
            let id = definition.id.clone();
            if agents.insert(id.clone(), Arc::new(definition)).is_some() {
                return Err(registry_error::DuplicateAgentSnafu { agent_id: id }.build());
            }
        }

        let registry = AgentRegistry {
            agents,
            default_namespace: self.default_namespace,
        };

        // Dangling spawnables are a runtime per-child failure, not a build
        // failure, but they are almost always a typo worth surfacing early.
        for id in registry.agent_ids() {
            if let Ok(def) = registry.resolve(&id) {
                for spawnable in &def.spawnable_agents {
                    if !registry.contains(spawnable) {
                        warn!(
                            agent_id = %id,
                            spawnable = %spawnable,
                            "spawnable agent does not resolve to any registered definition"
                        );
                    }
                }
            }
        }

        info!(agents = registry.len(), "agent registry built");
        Ok(registry)
    }
}

#[cfg(test)]
#[path = "registry.test.rs"]
mod tests;
