use super::*;

#[test]
fn test_error_display() {
    let err = tool_error::NotDeclaredSnafu { name: "search" }.build();
    assert_eq!(err.to_string(), "Tool not declared by agent: search");

    let err = tool_error::SpawnNotDeclaredSnafu {
        agent_ids: vec!["worker".to_string(), "critic".to_string()],
    }
    .build();
    assert_eq!(
        err.to_string(),
        "Agents not declared as spawnable: worker, critic"
    );

    let err = tool_error::NotFoundSnafu { name: "search" }.build();
    assert_eq!(err.to_string(), "Tool not found: search");

    let err = tool_error::TimeoutSnafu { timeout_secs: 120_i64 }.build();
    assert_eq!(err.to_string(), "Timeout after 120s");
}

#[test]
fn test_capability_violation_classification() {
    let violations = [
        tool_error::NotDeclaredSnafu { name: "search" }.build(),
        tool_error::SpawnNotDeclaredSnafu {
            agent_ids: vec!["worker".to_string()],
        }
        .build(),
        tool_error::NotFoundSnafu { name: "search" }.build(),
    ];
    for err in violations {
        assert!(err.is_capability_violation(), "should abort run: {err}");
    }

    let tool_level = [
        tool_error::InvalidInputSnafu { message: "bad" }.build(),
        tool_error::ExecutionFailedSnafu { message: "boom" }.build(),
        tool_error::TimeoutSnafu { timeout_secs: 5_i64 }.build(),
        tool_error::InternalSnafu { message: "bug" }.build(),
        tool_error::CancelledSnafu.build(),
    ];
    for err in tool_level {
        assert!(!err.is_capability_violation(), "should stay in-band: {err}");
    }
}

#[test]
fn test_is_cancelled() {
    assert!(tool_error::CancelledSnafu.build().is_cancelled());
    assert!(
        !tool_error::InternalSnafu { message: "x" }
            .build()
            .is_cancelled()
    );
}

#[test]
fn test_from_serde_json() {
    let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
    let err: ToolError = json_err.into();
    assert!(matches!(err, ToolError::InvalidInput { .. }));
    assert!(err.to_output_message().contains("JSON error"));
}
