use crate::errors::{AppError, AppResult};
use crate::models::AppSettings;
use crate::store::KeyValueStorage;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// SQLite-backed key-value slots plus application settings.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Storage(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };

        db.ensure_default_settings()?;

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn get_settings(&self) -> AppResult<AppSettings> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = 'app'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => serde_json::from_str::<AppSettings>(&raw).map_err(|error| {
                tracing::error!(error = %error, "stored settings are unreadable");
                AppError::Storage(format!("unreadable settings: {}", error))
            }),
            None => Ok(AppSettings::default()),
        }
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: AppSettings = serde_json::from_value(merged)
            .map_err(|error| AppError::InvalidInput(format!("invalid settings: {}", error)))?;
        if !(1..=4).contains(&settings.period.quarter) {
            return Err(AppError::InvalidInput(format!(
                "quarter must be between 1 and 4, got {}",
                settings.period.quarter
            )));
        }

        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES ('app', ?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![serde_json::to_string(&settings)?, Utc::now().to_rfc3339()],
        )?;

        tracing::info!(role = settings.role.as_str(), year = settings.period.year, quarter = settings.period.quarter, "settings updated");
        Ok(settings)
    }

    fn ensure_default_settings(&self) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count: i64 = conn.query_row("SELECT COUNT(1) FROM settings WHERE key = 'app'", [], |row| row.get(0))?;
        if count == 0 {
            conn.execute(
                "INSERT INTO settings (key, value_json, updated_at) VALUES ('app', ?1, ?2)",
                params![
                    serde_json::to_string(&AppSettings::default())?,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }
        Ok(())
    }
}

impl KeyValueStorage for Database {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::errors::AppError;
    use crate::models::Role;
    use crate::store::KeyValueStorage;

    #[test]
    fn key_value_slots_round_trip_and_replace() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        assert!(db.get("doc").expect("get").is_none());
        db.set("doc", "{\"a\":1}").expect("set");
        db.set("doc", "{\"a\":2}").expect("replace");
        assert_eq!(db.get("doc").expect("get").as_deref(), Some("{\"a\":2}"));

        db.remove("doc").expect("remove");
        assert!(db.get("doc").expect("get").is_none());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("state.sqlite");
        {
            let db = Database::new(&db_path).expect("db");
            db.set("doc", "persisted").expect("set");
        }
        let reopened = Database::new(&db_path).expect("reopen");
        assert_eq!(reopened.get("doc").expect("get").as_deref(), Some("persisted"));
        assert_eq!(reopened.path(), db_path.as_path());
    }

    #[test]
    fn settings_default_and_merge() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        let defaults = db.get_settings().expect("settings");
        assert_eq!(defaults.role, Role::Viewer);
        assert_eq!(defaults.period.quarter, 1);

        let updated = db
            .update_settings(serde_json::json!({ "role": "editor", "period": { "quarter": 3 } }))
            .expect("update");
        assert_eq!(updated.role, Role::Editor);
        assert_eq!(updated.period.quarter, 3);
        assert_eq!(updated.period.year, defaults.period.year);
        assert_eq!(db.get_settings().expect("reload"), updated);
    }

    #[test]
    fn settings_reject_bad_quarter_and_role() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        let error = db
            .update_settings(serde_json::json!({ "period": { "quarter": 5 } }))
            .expect_err("bad quarter");
        assert!(matches!(error, AppError::InvalidInput(_)));

        let error = db
            .update_settings(serde_json::json!({ "role": "owner" }))
            .expect_err("bad role");
        assert!(matches!(error, AppError::InvalidInput(_)));
        assert_eq!(db.get_settings().expect("settings").role, Role::Viewer);
    }

    #[test]
    fn unreadable_settings_row_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");
        db.update_settings(serde_json::json!({ "role": "admin" })).expect("update");
        {
            let conn = db.conn.lock().expect("lock");
            conn.execute("UPDATE settings SET value_json = '{\"role\":' WHERE key = 'app'", [])
                .expect("corrupt");
        }

        let error = db.get_settings().expect_err("unreadable");
        assert!(matches!(error, AppError::Storage(_)));
        let error = db
            .update_settings(serde_json::json!({ "period": { "quarter": 2 } }))
            .expect_err("update over unreadable row");
        assert!(matches!(error, AppError::Storage(_)));
    }
}
