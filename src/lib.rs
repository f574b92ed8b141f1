pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod queries;
pub mod schema;
pub mod service;
pub mod store;
pub mod validation;

use crate::config::Command;
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{AppSettings, EntityKind, Record, Role};
use crate::service::DataService;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

pub use crate::errors::AppError as Error;
pub use crate::models::{Document, HistoryRecord, MutationResult};
pub use crate::store::{DocumentStore, KeyValueStorage, MemoryStorage};

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Application shell over the data service: resolves entity names, parses
/// JSON input and gates writes by role. The service itself never checks roles.
pub struct Dashboard {
    service: DataService<Database>,
}

impl Dashboard {
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        let db_path = data_dir.join("state.sqlite");
        let db = Database::new(&db_path)?;
        tracing::info!(path = %db_path.display(), "dashboard storage opened");
        Ok(Self {
            service: DataService::new(db),
        })
    }

    pub fn service(&self) -> &DataService<Database> {
        &self.service
    }

    pub fn settings(&self) -> AppResult<AppSettings> {
        self.service.store().storage().get_settings()
    }

    pub fn execute(&self, command: Command, role_override: Option<Role>) -> AppResult<Value> {
        let settings = self.settings()?;
        let role = role_override.unwrap_or(settings.role);

        match command {
            Command::List { kind, include_archived } => {
                let kind: EntityKind = kind.parse()?;
                if include_archived {
                    to_json(self.service.get_all_including_archived(kind)?)
                } else {
                    to_json(self.service.get_all(kind)?)
                }
            }
            Command::Get { kind, id } => to_json(self.service.get_by_id(kind.parse()?, &id)?),
            Command::Create { kind, json } => {
                let kind: EntityKind = kind.parse()?;
                require_editor(role)?;
                to_json(self.service.create(kind, parse_object(&json)?)?)
            }
            Command::Update { kind, id, json } => {
                let kind: EntityKind = kind.parse()?;
                require_editor(role)?;
                to_json(self.service.update(kind, &id, parse_object(&json)?)?)
            }
            Command::Archive { kind, id } => {
                let kind: EntityKind = kind.parse()?;
                require_editor(role)?;
                to_json(self.service.archive(kind, &id)?)
            }
            Command::Restore { kind, id } => {
                let kind: EntityKind = kind.parse()?;
                require_editor(role)?;
                to_json(self.service.restore(kind, &id)?)
            }
            Command::History { kind, id } => match (kind, id) {
                (Some(kind), Some(id)) => to_json(self.service.get_history(kind.parse()?, &id)?),
                (None, None) => to_json(self.service.list_history()?),
                _ => Err(AppError::InvalidInput(
                    "history needs both an entity kind and an id, or neither".to_string(),
                )),
            },
            Command::Stats => to_json(self.service.summary_stats()?),
            Command::UpcomingLaunches => to_json(self.service.upcoming_launches()?),
            Command::PeriodLaunches => to_json(self.service.launches_in_period(settings.period)?),
            Command::Department { department } => {
                if !schema::departments().iter().any(|known| known.id == department) {
                    return Err(AppError::InvalidInput(format!("unknown department: {}", department)));
                }
                to_json(self.service.kpi_progress_by_department(&department)?)
            }
            Command::Roadmap { year } => match year {
                Some(year) => to_json(self.service.roadmap_by_year(year)?),
                None => to_json(self.service.roadmap_items()?),
            },
            Command::Settings { json } => match json {
                Some(raw) => {
                    let patch: Value = serde_json::from_str(&raw)
                        .map_err(|error| AppError::InvalidInput(format!("invalid JSON: {}", error)))?;
                    to_json(self.service.store().storage().update_settings(patch)?)
                }
                None => to_json(settings),
            },
            Command::Reset => {
                if !role.is_admin() {
                    return Err(AppError::Forbidden("reset requires the admin role".to_string()));
                }
                let document = self.service.reset()?;
                Ok(serde_json::json!({ "reset": true, "lastUpdated": document.last_updated }))
            }
        }
    }
}

fn require_editor(role: Role) -> AppResult<()> {
    if role.can_edit() {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "role {} cannot modify dashboard data",
        role.as_str()
    )))
}

fn parse_object(raw: &str) -> AppResult<Record> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(_) => Err(AppError::InvalidInput("expected a JSON object".to_string())),
        Err(error) => Err(AppError::InvalidInput(format!("invalid JSON: {}", error))),
    }
}

fn to_json(value: impl Serialize) -> AppResult<Value> {
    Ok(serde_json::to_value(value)?)
}

pub fn init_tracing(data_dir: &Path, default_level: &str) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use super::Dashboard;
    use crate::config::Command;
    use crate::errors::AppError;
    use crate::models::Role;

    fn open() -> (tempfile::TempDir, Dashboard) {
        let dir = tempfile::tempdir().expect("tempdir");
        let dashboard = Dashboard::open(dir.path()).expect("open");
        (dir, dashboard)
    }

    #[test]
    fn viewers_cannot_write() {
        let (_dir, dashboard) = open();
        let error = dashboard
            .execute(
                Command::Archive {
                    kind: "kpi".to_string(),
                    id: "kpi-1".to_string(),
                },
                None,
            )
            .expect_err("viewer write");
        assert!(matches!(error, AppError::Forbidden(_)));

        let result = dashboard
            .execute(
                Command::Archive {
                    kind: "kpi".to_string(),
                    id: "kpi-1".to_string(),
                },
                Some(Role::Editor),
            )
            .expect("editor write");
        assert_eq!(result["success"], true);
    }

    #[test]
    fn unknown_kind_is_reported_before_role_check() {
        let (_dir, dashboard) = open();
        let error = dashboard
            .execute(
                Command::Create {
                    kind: "rocket".to_string(),
                    json: "{}".to_string(),
                },
                None,
            )
            .expect_err("unknown kind");
        assert!(matches!(error, AppError::UnknownEntityType(_)));
    }

    #[test]
    fn create_rejects_non_object_input() {
        let (_dir, dashboard) = open();
        let error = dashboard
            .execute(
                Command::Create {
                    kind: "kpi".to_string(),
                    json: "[1, 2]".to_string(),
                },
                Some(Role::Admin),
            )
            .expect_err("array input");
        assert!(matches!(error, AppError::InvalidInput(_)));
    }

    #[test]
    fn stored_role_gates_writes_and_reset_needs_admin() {
        let (_dir, dashboard) = open();
        dashboard
            .execute(
                Command::Settings {
                    json: Some("{\"role\":\"editor\"}".to_string()),
                },
                None,
            )
            .expect("settings");

        let created = dashboard
            .execute(
                Command::Create {
                    kind: "person".to_string(),
                    json: "{\"name\":\"Ada\",\"department\":\"technology\",\"role\":\"Engineer\",\"status\":\"active\"}"
                        .to_string(),
                },
                None,
            )
            .expect("create");
        assert_eq!(created["success"], true);

        let error = dashboard.execute(Command::Reset, None).expect_err("editor reset");
        assert!(matches!(error, AppError::Forbidden(_)));
        let reset = dashboard.execute(Command::Reset, Some(Role::Admin)).expect("admin reset");
        assert_eq!(reset["reset"], true);
    }

    #[test]
    fn history_requires_kind_and_id_together() {
        let (_dir, dashboard) = open();
        let error = dashboard
            .execute(
                Command::History {
                    kind: Some("kpi".to_string()),
                    id: None,
                },
                None,
            )
            .expect_err("partial history");
        assert!(matches!(error, AppError::InvalidInput(_)));

        let all = dashboard
            .execute(Command::History { kind: None, id: None }, None)
            .expect("history");
        assert_eq!(all, serde_json::json!([]));
    }

    #[test]
    fn department_progress_checks_the_department_table() {
        let (_dir, dashboard) = open();
        let error = dashboard
            .execute(
                Command::Department {
                    department: "marketing".to_string(),
                },
                None,
            )
            .expect_err("unknown department");
        assert!(matches!(error, AppError::InvalidInput(_)));

        let progress = dashboard
            .execute(
                Command::Department {
                    department: "finance".to_string(),
                },
                None,
            )
            .expect("finance");
        assert!(!progress.as_array().expect("array").is_empty());
    }
}
