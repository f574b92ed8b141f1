use crate::errors::AppResult;
use crate::models::{is_archived, record_id, Document, EntityKind, HistoryAction, HistoryRecord, MutationResult, Record};
use crate::schema::{apply_defaults, generate_id};
use crate::store::{DocumentStore, KeyValueStorage};
use crate::validation::validate;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// The only component that mutates the dashboard document. Every write is
/// load, validate, mutate, append history, save, within one call.
#[derive(Debug)]
pub struct DataService<S> {
    store: DocumentStore<S>,
}

impl<S: KeyValueStorage> DataService<S> {
    pub fn new(storage: S) -> Self {
        Self {
            store: DocumentStore::new(storage),
        }
    }

    pub fn store(&self) -> &DocumentStore<S> {
        &self.store
    }

    pub fn document(&self) -> AppResult<Document> {
        self.store.load()
    }

    pub fn create(&self, kind: EntityKind, input: Record) -> AppResult<MutationResult> {
        let mut document = self.store.load()?;
        let now = Utc::now();

        let mut candidate = input;
        candidate.insert("id".to_string(), Value::String(generate_id()));
        candidate.insert("lastUpdated".to_string(), timestamp_value(now));
        candidate.insert("archived".to_string(), Value::Bool(false));
        let item = apply_defaults(kind, candidate);

        let report = validate(kind, &item);
        if !report.valid {
            tracing::debug!(entity_type = kind.as_str(), errors = ?report.errors, "create rejected");
            return Ok(MutationResult::rejected(report.errors));
        }

        let entity_id = record_id(&item).unwrap_or_default().to_string();
        document.collection_mut(kind).push(item.clone());
        document.history.push(HistoryRecord {
            id: generate_id(),
            action: HistoryAction::Create,
            entity_type: kind,
            entity_id: entity_id.clone(),
            timestamp: now,
            data: Some(item.clone()),
            previous_data: None,
            new_data: None,
        });
        self.store.save(&mut document)?;

        tracing::info!(entity_type = kind.as_str(), entity_id = %entity_id, "entity created");
        Ok(MutationResult::applied(item))
    }

    /// Merges `patch` over the stored entity. `id` in the patch is ignored.
    pub fn update(&self, kind: EntityKind, id: &str, patch: Record) -> AppResult<MutationResult> {
        let mut document = self.store.load()?;
        let now = Utc::now();

        let collection = document.collection_mut(kind);
        let Some(index) = collection.iter().position(|item| record_id(item) == Some(id)) else {
            tracing::debug!(entity_type = kind.as_str(), entity_id = %id, "update target not found");
            return Ok(MutationResult::not_found());
        };

        let previous = collection[index].clone();
        let mut updated = previous.clone();
        for (field, value) in patch {
            if field == "id" {
                continue;
            }
            updated.insert(field, value);
        }
        updated.insert("lastUpdated".to_string(), timestamp_value(now));

        let report = validate(kind, &updated);
        if !report.valid {
            tracing::debug!(entity_type = kind.as_str(), entity_id = %id, errors = ?report.errors, "update rejected");
            return Ok(MutationResult::rejected(report.errors));
        }

        collection[index] = updated.clone();
        document.history.push(HistoryRecord {
            id: generate_id(),
            action: HistoryAction::Update,
            entity_type: kind,
            entity_id: id.to_string(),
            timestamp: now,
            data: None,
            previous_data: Some(previous),
            new_data: Some(updated.clone()),
        });
        self.store.save(&mut document)?;

        tracing::info!(entity_type = kind.as_str(), entity_id = %id, "entity updated");
        Ok(MutationResult::applied(updated))
    }

    pub fn archive(&self, kind: EntityKind, id: &str) -> AppResult<MutationResult> {
        self.update(kind, id, archived_patch(true))
    }

    pub fn restore(&self, kind: EntityKind, id: &str) -> AppResult<MutationResult> {
        self.update(kind, id, archived_patch(false))
    }

    /// Resolves archived entities too.
    pub fn get_by_id(&self, kind: EntityKind, id: &str) -> AppResult<Option<Record>> {
        let document = self.store.load()?;
        Ok(document
            .collection(kind)
            .iter()
            .find(|item| record_id(item) == Some(id))
            .cloned())
    }

    pub fn get_all(&self, kind: EntityKind) -> AppResult<Vec<Record>> {
        let document = self.store.load()?;
        Ok(active_records(&document, kind))
    }

    pub fn get_all_including_archived(&self, kind: EntityKind) -> AppResult<Vec<Record>> {
        let document = self.store.load()?;
        Ok(document.collection(kind).clone())
    }

    /// History of one entity, newest first.
    pub fn get_history(&self, kind: EntityKind, id: &str) -> AppResult<Vec<HistoryRecord>> {
        let document = self.store.load()?;
        let entries = document
            .history
            .into_iter()
            .filter(|entry| entry.entity_type == kind && entry.entity_id == id)
            .collect();
        Ok(newest_first(entries))
    }

    pub fn list_history(&self) -> AppResult<Vec<HistoryRecord>> {
        let document = self.store.load()?;
        Ok(newest_first(document.history))
    }

    pub fn reset(&self) -> AppResult<Document> {
        self.store.reset()?;
        self.store.load()
    }
}

pub(crate) fn active_records(document: &Document, kind: EntityKind) -> Vec<Record> {
    document
        .collection(kind)
        .iter()
        .filter(|item| !is_archived(item))
        .cloned()
        .collect()
}

fn archived_patch(archived: bool) -> Record {
    let mut patch = Record::new();
    patch.insert("archived".to_string(), Value::Bool(archived));
    patch
}

fn timestamp_value(now: DateTime<Utc>) -> Value {
    Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Later appends win ties on equal timestamps.
fn newest_first(entries: Vec<HistoryRecord>) -> Vec<HistoryRecord> {
    let mut entries: Vec<HistoryRecord> = entries.into_iter().rev().collect();
    entries.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
    entries
}
