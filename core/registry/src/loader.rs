//! Loading agent definitions from TOML files.

use std::path::Path;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::definition::AgentDefinition;

/// Load every valid agent definition from `*.toml` files in a directory.
///
/// Invalid files are skipped with a warning rather than failing the whole
/// load; a missing directory yields an empty list.
pub fn load_definitions_dir(dir: &Path) -> Vec<AgentDefinition> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "agent definition directory does not exist");
        return Vec::new();
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %dir.display(), error = %err, "failed to read agent definition directory");
            return Vec::new();
        }
    };

    let mut definitions = Vec::new();
    for entry in entries.filter_map(std::result::Result::ok) {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("toml") {
            continue;
        }

        match load_definition_file(&path) {
            Ok(def) => {
                info!(agent_id = %def.id, path = %path.display(), "loaded agent definition");
                definitions.push(def);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping invalid agent definition");
            }
        }
    }

    definitions
}

fn load_definition_file(path: &Path) -> Result<AgentDefinition, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let definition: AgentDefinition = toml::from_str(&content)?;
    definition.validate()?;
    Ok(definition)
}

#[cfg(test)]
#[path = "loader.test.rs"]
mod tests;
