use directit::envfile::{load, merged_env, parse};
use std::fs;
use tempfile::tempdir;

#[test]
fn parse_envfile() {
    let text = r#"
# store credentials
DIRECTIT_API_KEY=anon-key
EMPTY=
export STORE_URL=https://example.test
SINGLE='hello world'
DOUBLE="a\\nb"
RAW=value # trailing comment
"#;

    let out = parse(text).expect("parse dotenv");
    assert_eq!(out.get("DIRECTIT_API_KEY"), Some(&"anon-key".to_string()));
    assert_eq!(out.get("EMPTY"), Some(&"".to_string()));
    assert_eq!(out.get("STORE_URL"), Some(&"https://example.test".to_string()));
    assert_eq!(out.get("SINGLE"), Some(&"hello world".to_string()));
    assert_eq!(out.get("DOUBLE"), Some(&"a\\nb".to_string()));
    assert_eq!(out.get("RAW"), Some(&"value".to_string()));
}

#[test]
fn parse_rejects_invalid_lines() {
    assert!(parse("not-valid").is_err());
    assert!(parse("=value").is_err());
    assert!(parse("1KEY=value").is_err());
    assert!(parse("KEY='open").is_err());

    let err = parse("OK=1\nKEY=\"open").expect_err("unterminated");
    assert!(err.starts_with("line 2:"));
}

#[test]
fn load_missing_file() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("missing.env");
    let err = load(&path).expect_err("expected missing");
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
}

#[test]
fn merged_env_tolerates_missing_file() {
    let dir = tempdir().expect("tempdir");
    let vars = merged_env(&dir.path().join("missing.env")).expect("merged env");
    assert!(vars.contains_key("PATH") || std::env::var_os("PATH").is_none());
}

#[test]
fn merged_env_prefers_process_environment() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(".env");
    fs::write(&path, "PATH=/from/dotenv\nDIRECTIT_TEST_ONLY_KEY=from-file\n").expect("write env");

    let vars = merged_env(&path).expect("merged env");
    assert_eq!(
        vars.get("DIRECTIT_TEST_ONLY_KEY"),
        Some(&"from-file".to_string())
    );
    if let Ok(path_var) = std::env::var("PATH") {
        assert_eq!(vars.get("PATH"), Some(&path_var));
    }
}
