use snafu::Location;

use super::*;

fn not_declared(name: &str) -> ToolError {
    ToolError::NotDeclared {
        name: name.to_string(),
        location: Location::default(),
    }
}

#[test]
fn test_error_display() {
    let err = run_error::UnknownAgentSnafu { agent_id: "ghost" }.build();
    assert_eq!(err.to_string(), "Unknown agent: ghost");

    let err = run_error::ToolNotDeclaredSnafu { name: "search" }.build();
    assert_eq!(err.to_string(), "Tool not declared by agent: search");

    let err = run_error::SpawnNotDeclaredSnafu {
        agent_ids: vec!["worker".to_string(), "critic".to_string()],
    }
    .build();
    assert_eq!(
        err.to_string(),
        "Agents not declared as spawnable: worker, critic"
    );

    let err = run_error::MissingStructuredOutputSnafu { agent_id: "lead" }.build();
    assert_eq!(
        err.to_string(),
        "Agent lead finished without setting structured output"
    );

    assert_eq!(run_error::CancelledSnafu.build().to_string(), "Run cancelled");
}

#[test]
fn test_capability_violation_classification() {
    let violations = [
        run_error::UnknownAgentSnafu { agent_id: "ghost" }.build(),
        run_error::ToolNotDeclaredSnafu { name: "search" }.build(),
        run_error::SpawnNotDeclaredSnafu {
            agent_ids: vec!["worker".to_string()],
        }
        .build(),
    ];
    for err in violations {
        assert!(err.is_capability_violation(), "should be a violation: {err}");
    }

    let others = [
        run_error::MissingStructuredOutputSnafu { agent_id: "lead" }.build(),
        run_error::CancelledSnafu.build(),
    ];
    for err in others {
        assert!(!err.is_capability_violation(), "not a violation: {err}");
    }
}

#[test]
fn test_tool_error_lifting() {
    let err = run_error_from_tool("search", not_declared("search"));
    assert!(matches!(err, RunError::ToolNotDeclared { .. }));

    let err = run_error_from_tool(
        "spawn_agents",
        ToolError::SpawnNotDeclared {
            agent_ids: vec!["worker".to_string()],
            location: Location::default(),
        },
    );
    assert!(matches!(err, RunError::SpawnNotDeclared { .. }));

    let err = run_error_from_tool(
        "search",
        ToolError::Cancelled {
            location: Location::default(),
        },
    );
    assert!(err.is_cancelled());

    // Non-capability failures keep the source under Tool
    let err = run_error_from_tool(
        "search",
        ToolError::NotFound {
            name: "search".to_string(),
            location: Location::default(),
        },
    );
    match err {
        RunError::Tool { ref name, .. } => assert_eq!(name, "search"),
        other => panic!("expected Tool, got {other:?}"),
    }
    assert!(err.to_string().contains("Tool not found: search"));
}
