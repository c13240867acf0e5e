// tests/integration/error_handling.rs

use std::io::Write;

use tempfile::NamedTempFile;
use tupledag::config::load_and_validate;
use tupledag::errors::TupledagError;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn expect_config_error(contents: &str) -> String {
    let file = config_file(contents);
    match load_and_validate(file.path()) {
        Err(TupledagError::ConfigError(msg)) => msg,
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_zero_page_size_is_rejected() {
    let msg = expect_config_error(
        r#"
[engine]
page_size = 0

[[node]]
id = "node-1"
"#,
    );
    assert!(msg.contains("page_size"));
}

#[test]
fn test_algo_owned_by_unknown_node() {
    let msg = expect_config_error(
        r#"
[[node]]
id = "node-1"

[algo.sgd]
owner = "node-9"
"#,
    );
    assert!(msg.contains("sgd"));
    assert!(msg.contains("node-9"));
}

#[test]
fn test_objective_owned_by_unknown_node() {
    let msg = expect_config_error(
        r#"
[[node]]
id = "node-1"

[objective.auc]
owner = "ghost"
"#,
    );
    assert!(msg.contains("auc"));
}

#[test]
fn test_duplicate_node_is_rejected() {
    let msg = expect_config_error(
        r#"
[[node]]
id = "node-1"

[[node]]
id = "node-1"
"#,
    );
    assert!(msg.contains("more than once"));
}

#[test]
fn test_tuple_kind_is_not_an_algo_kind() {
    let msg = expect_config_error(
        r#"
[[node]]
id = "node-1"

[algo.sgd]
kind = "traintuple"
owner = "node-1"
"#,
    );
    assert!(msg.contains("sgd"));
}

#[test]
fn test_step_without_caller() {
    let msg = expect_config_error(
        r#"
[[node]]
id = "node-1"

[[step]]
action = "start"
caller = " "
key = "tt-1"
"#,
    );
    assert!(msg.contains("step 1"));
    assert!(msg.contains("start"));
}

#[test]
fn test_unknown_action_is_a_toml_error() {
    let file = config_file(
        r#"
[[step]]
action = "explode"
caller = "node-1"
"#,
    );
    match load_and_validate(file.path()) {
        Err(TupledagError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_and_validate(dir.path().join("Tupledag.toml"));
    assert!(matches!(result, Err(TupledagError::IoError(_))));
}
