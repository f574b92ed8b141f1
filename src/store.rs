use crate::errors::{AppError, AppResult};
use crate::models::{Document, SeedData};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

pub const STORAGE_KEY: &str = "involve-dashboard-data";

const SEED_JSON: &str = include_str!("seed.json");

/// Durable string slots addressed by key. Each `set` replaces the whole value.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let slots = self.slots.lock().map_err(|_| AppError::Internal("storage mutex poisoned".to_string()))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let mut slots = self.slots.lock().map_err(|_| AppError::Internal("storage mutex poisoned".to_string()))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        let mut slots = self.slots.lock().map_err(|_| AppError::Internal("storage mutex poisoned".to_string()))?;
        slots.remove(key);
        Ok(())
    }
}

/// Owns the single dashboard document inside a key-value backend.
#[derive(Debug)]
pub struct DocumentStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> DocumentStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the stored document, seeding and persisting one on first access.
    /// An existing value that fails to decode is reported, never replaced.
    pub fn load(&self) -> AppResult<Document> {
        if let Some(raw) = self.storage.get(STORAGE_KEY)? {
            return decode_document(&raw);
        }

        let seed: SeedData = serde_json::from_str(SEED_JSON)
            .map_err(|error| AppError::Internal(format!("invalid seed data: {}", error)))?;
        let document = Document::from_seed(seed, Utc::now());
        let raw = serde_json::to_string(&document)?;
        self.storage.set(STORAGE_KEY, &raw)?;
        tracing::info!(key = STORAGE_KEY, "seeded dashboard document");

        decode_document(&raw)
    }

    pub fn save(&self, document: &mut Document) -> AppResult<()> {
        document.last_updated = Utc::now();
        let raw = serde_json::to_string(document)?;
        self.storage.set(STORAGE_KEY, &raw)?;
        tracing::debug!(bytes = raw.len(), history = document.history.len(), "saved dashboard document");
        Ok(())
    }

    pub fn reset(&self) -> AppResult<()> {
        self.storage.remove(STORAGE_KEY)?;
        tracing::warn!(key = STORAGE_KEY, "dashboard document reset");
        Ok(())
    }
}

fn decode_document(raw: &str) -> AppResult<Document> {
    serde_json::from_str::<Document>(raw).map_err(|error| {
        tracing::error!(error = %error, key = STORAGE_KEY, "stored dashboard document is unreadable");
        AppError::CorruptDocument(error.to_string())
    })
}
