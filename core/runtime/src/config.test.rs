use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_defaults() {
    let config = RunConfig::default();
    assert_eq!(config.max_steps, 100);
    assert_eq!(config.retry.max_attempts, 3);
    assert_eq!(config.tool_timeout_secs, 120);
    assert_eq!(config.max_tool_concurrency, 10);
    assert_eq!(config.max_tool_output_chars, 100_000);
}

#[test]
fn test_empty_json_deserializes_to_defaults() {
    let config: RunConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.max_steps, 100);
    assert_eq!(config.retry.base_delay_ms, 1000);
    assert_eq!(config.max_tool_output_chars, 100_000);
}

#[test]
fn test_partial_json_keeps_other_defaults() {
    let config: RunConfig = serde_json::from_value(serde_json::json!({
        "max_steps": 5,
        "retry": { "max_attempts": 1 }
    }))
    .unwrap();
    assert_eq!(config.max_steps, 5);
    assert_eq!(config.retry.max_attempts, 1);
    // Untouched retry fields still default
    assert_eq!(config.retry.base_delay_ms, 1000);
    assert_eq!(config.tool_timeout_secs, 120);
}

#[test]
fn test_dispatcher_config_mapping() {
    let config = RunConfig::default()
        .with_tool_timeout_secs(30)
        .with_max_steps(10);
    let dispatcher = config.dispatcher_config();
    assert_eq!(dispatcher.default_timeout_secs, 30);
    assert_eq!(dispatcher.max_concurrency, 10);
    assert_eq!(dispatcher.max_output_chars, 100_000);
}
