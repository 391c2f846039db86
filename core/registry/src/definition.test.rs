use super::*;
use ensemble_protocol::OutputMode;
use serde_json::json;

#[test]
fn test_new_has_sensible_defaults() {
    let def = AgentDefinition::new("researcher", "sonnet-4");
    assert_eq!(def.id, "researcher");
    assert_eq!(def.model, "sonnet-4");
    assert_eq!(def.output_mode, OutputMode::LastMessage);
    assert!(def.tools.is_empty());
    assert!(def.spawnable_agents.is_empty());
    assert!(!def.include_message_history);
    assert_eq!(def.name(), "researcher");
}

#[test]
fn test_declares_tool_and_can_spawn() {
    let def = AgentDefinition::new("lead", "sonnet-4")
        .with_tools(["search", "spawn_agents"])
        .with_spawnable_agents(["team/worker"]);

    assert!(def.declares_tool("search"));
    assert!(!def.declares_tool("write_file"));
    assert!(def.can_spawn("team/worker"));
    assert!(!def.can_spawn("worker"));
}

#[test]
fn test_validate_params_without_schema_accepts_anything() {
    let def = AgentDefinition::new("a", "m");
    assert!(def.validate_params(None).is_valid());
    assert!(def.validate_params(Some(&json!({"x": 1}))).is_valid());
}

#[test]
fn test_validate_params_with_schema() {
    let def = AgentDefinition::new("a", "m").with_input_schema(json!({
        "type": "object",
        "properties": {"topic": {"type": "string"}},
        "required": ["topic"]
    }));

    assert!(def.validate_params(Some(&json!({"topic": "rust"}))).is_valid());
    assert!(!def.validate_params(Some(&json!({}))).is_valid());
    // Missing params are validated as null against the schema.
    assert!(!def.validate_params(None).is_valid());
}

#[test]
fn test_validate_rejects_empty_id_and_model() {
    let def = AgentDefinition::new("", "m");
    assert!(def.validate().is_err());

    let def = AgentDefinition::new("a", "  ");
    assert!(def.validate().is_err());
}

#[test]
fn test_validate_requires_output_schema_for_structured_mode() {
    let def = AgentDefinition::new("a", "m").with_output_mode(OutputMode::StructuredOutput);
    let err = def.validate().unwrap_err();
    assert!(err.to_string().contains("output_schema"));

    let def = AgentDefinition::new("a", "m")
        .with_output_mode(OutputMode::StructuredOutput)
        .with_output_schema(json!({"type": "object"}));
    assert!(def.validate().is_ok());
}

#[test]
fn test_validate_rejects_non_object_schema() {
    let def = AgentDefinition::new("a", "m").with_input_schema(json!("not a schema"));
    assert!(def.validate().is_err());
}

#[test]
fn test_toml_round_trip() {
    let toml_src = r#"
id = "team/researcher"
model = "sonnet-4"
system_prompt = "Research topics thoroughly."
tools = ["search", "set_output"]
spawnable_agents = ["team/summarizer"]
output_mode = "structured_output"

[output_schema]
type = "object"
required = ["findings"]
"#;
    let def: AgentDefinition = toml::from_str(toml_src).unwrap();
    assert_eq!(def.id, "team/researcher");
    assert_eq!(def.output_mode, OutputMode::StructuredOutput);
    assert!(def.declares_tool("set_output"));
    assert!(def.validate().is_ok());
    assert_eq!(def.output_schema.unwrap()["required"][0], "findings");
}
