use super::*;
use tempfile::TempDir;

#[test]
fn test_missing_directory_yields_empty() {
    let defs = load_definitions_dir(Path::new("/nonexistent/agents"));
    assert!(defs.is_empty());
}

#[test]
fn test_load_valid_definitions() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("researcher.toml"),
        r#"
id = "team/researcher"
model = "sonnet-4"
system_prompt = "You research topics."
tools = ["search"]
"#,
    )
    .unwrap();
    std::fs::write(
        temp_dir.path().join("writer.toml"),
        r#"
id = "team/writer"
model = "haiku-3"
"#,
    )
    .unwrap();
    // Non-TOML files are ignored.
    std::fs::write(temp_dir.path().join("README.md"), "docs").unwrap();

    let mut defs = load_definitions_dir(temp_dir.path());
    defs.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(defs.len(), 2);
    assert_eq!(defs[0].id, "team/researcher");
    assert_eq!(defs[1].id, "team/writer");
}

#[test]
fn test_invalid_files_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    // Parse error.
    std::fs::write(temp_dir.path().join("broken.toml"), "id = [unclosed").unwrap();
    // Validation error: structured output without a schema.
    std::fs::write(
        temp_dir.path().join("invalid.toml"),
        r#"
id = "bad"
model = "sonnet-4"
output_mode = "structured_output"
"#,
    )
    .unwrap();
    // One good file survives.
    std::fs::write(
        temp_dir.path().join("good.toml"),
        r#"
id = "good"
model = "sonnet-4"
"#,
    )
    .unwrap();

    let defs = load_definitions_dir(temp_dir.path());
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].id, "good");
}

#[test]
fn test_builder_load_directory_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("worker.toml"),
        r#"
id = "team/worker"
model = "haiku-3"
"#,
    )
    .unwrap();

    let registry = crate::AgentRegistry::builder()
        .default_namespace("team")
        .load_directory(temp_dir.path())
        .build()
        .unwrap();

    assert!(registry.resolve("worker").is_ok());
}
