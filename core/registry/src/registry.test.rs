use super::*;
use crate::error::RegistryError;
use pretty_assertions::assert_eq;

fn test_definition(id: &str) -> AgentDefinition {
    AgentDefinition::new(id, "sonnet-4")
}

#[test]
fn test_resolve_exact_match() {
    let registry = AgentRegistry::builder()
        .register(test_definition("researcher"))
        .build()
        .unwrap();

    let def = registry.resolve("researcher").unwrap();
    assert_eq!(def.id, "researcher");
}

#[test]
fn test_resolve_unknown_agent() {
    let registry = AgentRegistry::builder().build().unwrap();
    let err = registry.resolve("ghost").unwrap_err();
    assert!(matches!(err, RegistryError::UnknownAgent { ref agent_id, .. } if agent_id == "ghost"));
    assert_eq!(err.to_string(), "Unknown agent: ghost");
}

#[test]
fn test_resolve_namespace_fallback() {
    let registry = AgentRegistry::builder()
        .default_namespace("team")
        .register(test_definition("team/researcher"))
        .build()
        .unwrap();

    // Bare ID falls back to the default namespace.
    let def = registry.resolve("researcher").unwrap();
    assert_eq!(def.id, "team/researcher");

    // Qualified ID still resolves directly.
    assert!(registry.resolve("team/researcher").is_ok());
}

#[test]
fn test_exact_match_wins_over_fallback() {
    let registry = AgentRegistry::builder()
        .default_namespace("team")
        .register(test_definition("researcher"))
        .register(test_definition("team/researcher"))
        .build()
        .unwrap();

    let def = registry.resolve("researcher").unwrap();
    assert_eq!(def.id, "researcher");
}

#[test]
fn test_qualified_ids_do_not_fall_back() {
    let registry = AgentRegistry::builder()
        .default_namespace("team")
        .register(test_definition("team/other/worker"))
        .build()
        .unwrap();

    // "other/worker" is already qualified; no "team/other/worker" retry.
    assert!(registry.resolve("other/worker").is_err());
}

#[test]
fn test_no_fallback_without_default_namespace() {
    let registry = AgentRegistry::builder()
        .register(test_definition("team/researcher"))
        .build()
        .unwrap();

    assert!(registry.resolve("researcher").is_err());
}

#[test]
fn test_duplicate_ids_rejected() {
    let result = AgentRegistry::builder()
        .register(test_definition("dup"))
        .register(test_definition("dup"))
        .build();

    assert!(matches!(
        result.unwrap_err(),
        RegistryError::DuplicateAgent { ref agent_id, .. } if agent_id == "dup"
    ));
}

#[test]
fn test_invalid_definition_rejected_at_build() {
    let result = AgentRegistry::builder()
        .register(AgentDefinition::new("bad", ""))
        .build();
    assert!(matches!(
        result.unwrap_err(),
        RegistryError::InvalidDefinition { .. }
    ));
}

#[test]
fn test_agent_ids_sorted() {
    let registry = AgentRegistry::builder()
        .register(test_definition("zeta"))
        .register(test_definition("alpha"))
        .register(test_definition("mid"))
        .build()
        .unwrap();

    assert_eq!(registry.agent_ids(), vec!["alpha", "mid", "zeta"]);
    assert_eq!(registry.len(), 3);
    assert!(!registry.is_empty());
}
