use async_trait::async_trait;
use ensemble_protocol::ToolOutput;

use super::*;
use crate::context::ToolContext;
use crate::error::Result;

struct TestTool {
    name: String,
}

#[async_trait]
impl Tool for TestTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Test tool"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(
        &self,
        _input: serde_json::Value,
        _ctx: &mut ToolContext,
    ) -> Result<ToolOutput> {
        Ok(ToolOutput::text("ok"))
    }
}

fn test_tool(name: &str) -> TestTool {
    TestTool {
        name: name.to_string(),
    }
}

#[test]
fn test_register_and_get() {
    let mut registry = ToolRegistry::new();
    registry.register(test_tool("test"));

    assert!(registry.has("test"));
    assert!(registry.get("test").is_some());
    assert!(registry.get("nonexistent").is_none());
    assert_eq!(registry.len(), 1);
    assert!(!registry.is_empty());
}

#[test]
fn test_register_arc() {
    let mut registry = ToolRegistry::new();
    let tool: std::sync::Arc<dyn Tool> = std::sync::Arc::new(test_tool("shared"));
    registry.register_arc(tool);

    assert!(registry.has("shared"));
}

#[test]
fn test_reregister_replaces() {
    let mut registry = ToolRegistry::new();
    registry.register(test_tool("dup"));
    registry.register(test_tool("dup"));

    assert_eq!(registry.len(), 1);
}

#[test]
fn test_tool_names_sorted() {
    let mut registry = ToolRegistry::new();
    registry.register(test_tool("beta"));
    registry.register(test_tool("alpha"));

    let names = registry.tool_names();
    assert_eq!(names, vec!["alpha", "beta"]);
}

#[test]
fn test_all_definitions() {
    let mut registry = ToolRegistry::new();
    registry.register(test_tool("tool1"));
    registry.register(test_tool("tool2"));

    let defs = registry.all_definitions();
    assert_eq!(defs.len(), 2);
}

#[test]
fn test_definitions_for_declared_subset() {
    let mut registry = ToolRegistry::new();
    registry.register(test_tool("search"));
    registry.register(test_tool("read_file"));
    registry.register(test_tool("unrelated"));

    let declared = vec!["read_file".to_string(), "search".to_string()];
    let defs = registry.definitions_for(&declared);

    // Declaration order, not registry order
    assert_eq!(defs.len(), 2);
    assert_eq!(defs[0].name, "read_file");
    assert_eq!(defs[1].name, "search");
}

#[test]
fn test_definitions_for_skips_missing_handlers() {
    let mut registry = ToolRegistry::new();
    registry.register(test_tool("search"));

    let declared = vec!["search".to_string(), "ghost".to_string()];
    let defs = registry.definitions_for(&declared);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name, "search");
}
