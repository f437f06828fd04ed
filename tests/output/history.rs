use directit::model::ExecutionStatus;
use directit::output::{HistoryRow, print_history};
use time::OffsetDateTime;

#[test]
fn print_history_empty() {
    let mut out = Vec::new();
    print_history(&mut out, &[]).expect("print history");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("No executions recorded yet"));
}

#[test]
fn print_history_rows() {
    let started_at = OffsetDateTime::now_utc();
    let rows = vec![
        HistoryRow {
            script: "Nightly Backup".to_string(),
            execution_id: "exec-1".to_string(),
            status: ExecutionStatus::Completed,
            started_at,
            completed_at: Some(started_at + time::Duration::milliseconds(2_500)),
            message: Some("Script executed successfully".to_string()),
        },
        HistoryRow {
            script: "s2".to_string(),
            execution_id: "exec-2".to_string(),
            status: ExecutionStatus::Running,
            started_at,
            completed_at: None,
            message: None,
        },
    ];

    let mut out = Vec::new();
    print_history(&mut out, &rows).expect("print history");
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("Nightly Backup"));
    assert!(text.contains("completed"));
    assert!(text.contains("2.500s"));
    assert!(text.contains("message: Script executed successfully"));
    assert!(text.contains("running"));
    assert!(text.contains("exec-2"));
}
