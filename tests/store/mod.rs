use crate::support::{category, script};
use directit::model::{ExecutionStatus, ExecutionUpdate, NewExecution};
use directit::store::{
    EXECUTIONS_TABLE, ExecutionFilter, FileStore, RestStore, SCRIPTS_TABLE, Store, StoreError,
    rejection_message,
};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::time::Duration;
use tempfile::tempdir;
use time::OffsetDateTime;

fn new_execution(script_id: &str) -> NewExecution {
    NewExecution {
        script_id: script_id.to_string(),
        status: ExecutionStatus::Running,
        started_at: OffsetDateTime::now_utc(),
    }
}

#[test]
fn file_store_lists_in_display_order() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::new(dir.path().join("tables"));

    store
        .seed(
            &[category("b", "Second", 2), category("a", "First", 1)],
            &[
                script("late", "a", "Late", 3),
                script("tie-one", "a", "Tie One", 1),
                script("tie-two", "a", "Tie Two", 1),
            ],
        )
        .expect("seed");

    let categories = store.list_categories().expect("categories");
    assert_eq!(categories[0].id, "a");
    assert_eq!(categories[1].id, "b");

    let scripts = store.list_scripts().expect("scripts");
    let ids: Vec<&str> = scripts.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["tie-one", "tie-two", "late"]);
}

#[test]
fn file_store_missing_tables_are_empty() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::new(dir.path().join("missing"));

    assert!(store.list_categories().expect("categories").is_empty());
    assert!(store.list_scripts().expect("scripts").is_empty());
    assert!(
        store
            .list_executions(&ExecutionFilter::default())
            .expect("executions")
            .is_empty()
    );
}

#[test]
fn file_store_skips_malformed_lines() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());
    store
        .seed(&[category("a", "First", 1)], &[script("good", "a", "Good", 1)])
        .expect("seed");

    let mut file = OpenOptions::new()
        .append(true)
        .open(store.table_path(SCRIPTS_TABLE))
        .expect("open for append");
    writeln!(file, "{{bad").expect("write malformed");

    let scripts = store.list_scripts().expect("scripts");
    assert_eq!(scripts.len(), 1);
    assert_eq!(scripts[0].id, "good");
}

#[test]
fn file_store_execution_lifecycle() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());

    let first = store.create_execution(&new_execution("s1")).expect("create first");
    let second = store
        .create_execution(&new_execution("s2"))
        .expect("create second");
    assert_ne!(first, second);

    store
        .update_execution(&first, &ExecutionUpdate::completed("done"))
        .expect("update");

    let rows = store
        .list_executions(&ExecutionFilter::default())
        .expect("list");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, second);
    assert_eq!(rows[0].status, ExecutionStatus::Running);
    assert_eq!(rows[1].status, ExecutionStatus::Completed);
    assert_eq!(rows[1].output_log.as_deref(), Some("done"));
    assert!(rows[1].completed_at.is_some());

    let completed = store
        .list_executions(&ExecutionFilter {
            status: Some(ExecutionStatus::Completed),
            ..ExecutionFilter::default()
        })
        .expect("filter status");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, first);

    let by_script = store
        .list_executions(&ExecutionFilter {
            script_id: Some("s2".to_string()),
            limit: Some(5),
            ..ExecutionFilter::default()
        })
        .expect("filter script");
    assert_eq!(by_script.len(), 1);
    assert_eq!(by_script[0].script_id, "s2");
}

#[test]
fn file_store_update_unknown_execution() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());

    let err = store
        .update_execution("nope", &ExecutionUpdate::failed("boom"))
        .expect_err("expected not found");
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn file_store_settled_execution_is_not_rewritten() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());

    let id = store
        .create_execution(&new_execution("nightly-backup"))
        .expect("create");
    store
        .update_execution(&id, &ExecutionUpdate::completed("done"))
        .expect("first update");

    let err = store
        .update_execution(&id, &ExecutionUpdate::failed("late"))
        .expect_err("expected settled");
    assert!(matches!(err, StoreError::Settled { .. }));

    let rows = store
        .list_executions(&ExecutionFilter::default())
        .expect("list");
    assert_eq!(rows[0].status, ExecutionStatus::Completed);
    assert_eq!(rows[0].error_message, None);
}

#[test]
fn seed_sample_only_once() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());

    assert!(store.seed_sample().expect("first seed"));
    assert!(!store.seed_sample().expect("second seed"));
    assert!(!store.list_categories().expect("categories").is_empty());
}

#[test]
fn rest_store_rejects_bad_settings() {
    let err = RestStore::new("not a url", "key", Duration::from_secs(1)).expect_err("bad url");
    assert!(matches!(err, StoreError::Config(_)));

    let err = RestStore::new("https://example.test", " ", Duration::from_secs(1))
        .expect_err("missing key");
    assert!(matches!(err, StoreError::Config(_)));
}

#[test]
fn rest_store_table_url() {
    let store =
        RestStore::new("https://example.test/", "key", Duration::from_secs(1)).expect("store");
    assert_eq!(
        store.table_url("scripts"),
        "https://example.test/rest/v1/scripts"
    );
}

#[test]
fn rest_store_unreachable_host() {
    let store =
        RestStore::new("http://127.0.0.1:1", "key", Duration::from_secs(1)).expect("store");
    let err = store.list_categories().expect_err("expected transport failure");
    assert!(matches!(err, StoreError::Transport(_)));
}

#[test]
fn rejection_message_prefers_json_message() {
    assert_eq!(
        rejection_message(r#"{"code":"42P01","message":"relation does not exist"}"#),
        "relation does not exist"
    );
    assert_eq!(rejection_message("gateway timeout\n"), "gateway timeout");
    assert_eq!(rejection_message(""), "empty response body");
}

#[test]
fn file_store_update_keeps_undecodable_rows() {
    let dir = tempdir().expect("tempdir");
    let store = FileStore::new(dir.path());

    let id = store
        .create_execution(&new_execution("nightly-backup"))
        .expect("create");

    let path = store.table_path(EXECUTIONS_TABLE);
    let mut file = OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open for append");
    writeln!(file, "{{\"id\":\"future-row\",\"partial\":true}}").expect("write foreign row");
    file.write_all(b"\xff\xfe not utf8\n").expect("write raw bytes");
    drop(file);

    store
        .update_execution(&id, &ExecutionUpdate::completed("done"))
        .expect("update");

    let bytes = fs::read(&path).expect("read table");
    let lines: Vec<&[u8]> = bytes
        .split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], br#"{"id":"future-row","partial":true}"#);
    assert_eq!(lines[2], b"\xff\xfe not utf8");

    let rows = store
        .list_executions(&ExecutionFilter::default())
        .expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, ExecutionStatus::Completed);
}
