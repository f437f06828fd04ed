use crate::support::{MemoryStore, category, script};
use directit::catalog::{FetchError, find_script, group_scripts, load, summarize};
use directit::model::CategoryWithScripts;
use std::sync::atomic::Ordering;

fn script_ids(entry: &CategoryWithScripts) -> Vec<&str> {
    entry.scripts.iter().map(|s| s.id.as_str()).collect()
}

#[test]
fn load_backups_scenario() {
    let store = MemoryStore::new(
        vec![category("c1", "Backups", 1)],
        vec![script("s1", "c1", "Nightly Backup", 1)],
    );

    let catalog = load(&store).expect("load");
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog[0].category.name, "Backups");
    assert_eq!(catalog[0].scripts.len(), 1);
    assert_eq!(catalog[0].scripts[0].id, "s1");
}

#[test]
fn load_orders_categories_and_drops_orphans() {
    let store = MemoryStore::new(
        vec![
            category("ops", "Ops", 2),
            category("backups", "Backups", 1),
            category("empty", "Empty", 3),
        ],
        vec![
            script("rotate", "ops", "Rotate Logs", 2),
            script("orphan", "gone", "Orphan", 1),
            script("nightly", "backups", "Nightly", 1),
            script("clear", "ops", "Clear Temp", 1),
            script("verify", "backups", "Verify", 5),
        ],
    );

    let catalog = load(&store).expect("load");
    let names: Vec<&str> = catalog.iter().map(|c| c.category.name.as_str()).collect();
    assert_eq!(names, ["Backups", "Ops", "Empty"]);

    assert_eq!(script_ids(&catalog[0]), ["nightly", "verify"]);
    assert_eq!(script_ids(&catalog[1]), ["clear", "rotate"]);
    assert!(script_ids(&catalog[2]).is_empty());

    let all: Vec<&str> = catalog
        .iter()
        .flat_map(|c| c.scripts.iter().map(|s| s.id.as_str()))
        .collect();
    assert!(!all.contains(&"orphan"));
}

#[test]
fn group_scripts_keeps_input_order_on_ties() {
    let categories = vec![category("c1", "One", 1)];
    let scripts = vec![
        script("b", "c1", "B", 1),
        script("a", "c1", "A", 1),
        script("c", "c1", "C", 1),
    ];

    let grouped = group_scripts(categories, scripts);
    assert_eq!(script_ids(&grouped[0]), ["b", "a", "c"]);
}

#[test]
fn load_fails_when_categories_query_fails() {
    let store = MemoryStore::new(
        vec![category("c1", "Backups", 1)],
        vec![script("s1", "c1", "Nightly Backup", 1)],
    );
    MemoryStore::fail(&store.fail_categories);

    let err = load(&store).expect_err("expected fetch error");
    assert!(matches!(err, FetchError::Categories(_)));
    assert!(err.to_string().contains("failed to fetch categories"));

    MemoryStore::fail(&store.fail_scripts);
    let err = load(&store).expect_err("expected fetch error");
    assert!(matches!(err, FetchError::Categories(_)));
}

#[test]
fn load_fails_when_scripts_query_fails() {
    let store = MemoryStore::new(vec![category("c1", "Backups", 1)], Vec::new());
    MemoryStore::fail(&store.fail_scripts);

    let err = load(&store).expect_err("expected fetch error");
    assert!(matches!(err, FetchError::Scripts(_)));
    assert!(err.to_string().contains("scripts unavailable"));
}

#[test]
fn load_requeries_every_call() {
    let store = MemoryStore::new(vec![category("c1", "Backups", 1)], Vec::new());

    load(&store).expect("first load");
    load(&store).expect("second load");

    assert_eq!(store.category_queries.load(Ordering::SeqCst), 2);
    assert_eq!(store.script_queries.load(Ordering::SeqCst), 2);
}

#[test]
fn summarize_and_find_script() {
    let catalog = group_scripts(
        vec![category("c1", "Backups", 1), category("c2", "Ops", 2)],
        vec![
            script("s1", "c1", "Nightly Backup", 1),
            script("s2", "c2", "s1", 1),
            script("s3", "c2", "Rotate Logs", 2),
        ],
    );

    let summary = summarize(&catalog);
    assert_eq!(summary.scripts, 3);
    assert_eq!(summary.categories, 2);

    assert_eq!(
        find_script(&catalog, "s1").map(|s| s.name.as_str()),
        Some("Nightly Backup")
    );
    assert_eq!(
        find_script(&catalog, "Rotate Logs").map(|s| s.id.as_str()),
        Some("s3")
    );
    assert!(find_script(&catalog, "missing").is_none());
}
