use involve_dashboard_lib::db::Database;
use involve_dashboard_lib::errors::AppError;
use involve_dashboard_lib::models::EntityKind;
use involve_dashboard_lib::service::DataService;
use involve_dashboard_lib::store::STORAGE_KEY;
use involve_dashboard_lib::KeyValueStorage;
use serde_json::{json, Value};
use std::process::Command;

fn record(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().expect("object").clone()
}

#[test]
fn writes_survive_reopening_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("state.sqlite");

    let id = {
        let service = DataService::new(Database::new(&path).expect("open"));
        let created = service
            .create(
                EntityKind::Launch,
                record(json!({
                    "name": "Stratos test",
                    "platform": "Balloon",
                    "plannedDate": "2027-03-01",
                    "status": "planned"
                })),
            )
            .expect("create");
        assert!(created.success, "{:?}", created.errors);
        created.item.expect("item")["id"].as_str().expect("id").to_string()
    };

    let service = DataService::new(Database::new(&path).expect("reopen"));
    let stored = service.get_by_id(EntityKind::Launch, &id).expect("get").expect("present");
    assert_eq!(stored["platform"], json!("Balloon"));
    assert_eq!(service.get_history(EntityKind::Launch, &id).expect("history").len(), 1);
}

#[test]
fn unreadable_document_is_reported_not_reseeded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::new(&dir.path().join("state.sqlite")).expect("open");
    db.set(STORAGE_KEY, "{not json").expect("set");

    let service = DataService::new(db);
    let error = service.get_all(EntityKind::Kpi).expect_err("corrupt");
    assert!(matches!(error, AppError::CorruptDocument(_)));
    assert_eq!(
        service.store().storage().get(STORAGE_KEY).expect("get").as_deref(),
        Some("{not json")
    );
}

#[test]
fn seeded_summary_matches_fixture_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = DataService::new(Database::new(&dir.path().join("state.sqlite")).expect("open"));

    let stats = service.summary_stats().expect("stats");
    assert_eq!(stats.active_projects, 7);
    assert_eq!(stats.completed_launches, 3);
    assert_eq!(stats.success_rate, 67);
    assert_eq!(stats.active_team, 7);
    assert_eq!(stats.open_positions, 3);
}

#[cfg(unix)]
#[test]
fn cli_lists_and_gates_writes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let binary = env!("CARGO_BIN_EXE_involve-dashboard");

    let list = Command::new(binary)
        .env_remove("INVOLVE_ROLE")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(dir.path())
        .args(["list", "technologies"])
        .output()
        .expect("run list");
    assert!(list.status.success(), "{}", String::from_utf8_lossy(&list.stderr));
    let technologies: Value = serde_json::from_slice(&list.stdout).expect("json output");
    assert_eq!(technologies.as_array().expect("array").len(), 9);

    let denied = Command::new(binary)
        .env_remove("INVOLVE_ROLE")
        .arg("--data-dir")
        .arg(dir.path())
        .args(["archive", "technology", "tech-1"])
        .output()
        .expect("run archive");
    assert!(!denied.status.success());
    assert!(String::from_utf8_lossy(&denied.stderr).contains("FORBIDDEN"));

    let archived = Command::new(binary)
        .arg("--data-dir")
        .arg(dir.path())
        .args(["--role", "editor", "archive", "technology", "tech-1"])
        .output()
        .expect("run archive as editor");
    assert!(archived.status.success(), "{}", String::from_utf8_lossy(&archived.stderr));
    let result: Value = serde_json::from_slice(&archived.stdout).expect("json output");
    assert_eq!(result["success"], json!(true));
    assert_eq!(result["item"]["archived"], json!(true));
}
