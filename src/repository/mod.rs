//! Generic record store over the persisted blob
//!
//! All collections live in one JSON document stored under a single key.
//! Every call reads the whole document; every mutation writes the whole
//! document back together with its audit entry.

pub mod database;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    clock::{SharedClock, SystemClock},
    config::StorageConfig,
    error::{AppError, AppResult},
    models::{
        record::to_fields, AuditAction, AuditLogEntry, AuditQuery, Entity, Filter, Record,
    },
    storage::{Loaded, Storage},
};

pub use database::{Database, AUDIT_RESOURCE, DEFAULT_COLLECTIONS};

/// State of the persisted blob as seen at startup or by readiness checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreHealth {
    Healthy,
    Empty,
    Corrupted,
}

/// Record store shared by all services
#[derive(Clone)]
pub struct Repository {
    storage: Storage,
    db_key: String,
    latency: Duration,
    audit_capacity: usize,
    clock: SharedClock,
    write_lock: Arc<Mutex<()>>,
}

impl Repository {
    pub fn new(storage: Storage, config: &StorageConfig) -> Self {
        Self {
            storage,
            db_key: config.db_key.clone(),
            latency: config.latency(),
            audit_capacity: config.audit_capacity,
            clock: Arc::new(SystemClock),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Inspect the stored blob without touching it
    pub async fn health(&self) -> AppResult<StoreHealth> {
        Ok(match self.storage.load::<Database>(&self.db_key).await? {
            Loaded::Found(_) => StoreHealth::Healthy,
            Loaded::Missing => StoreHealth::Empty,
            Loaded::Corrupted { .. } => StoreHealth::Corrupted,
        })
    }

    /// Records of `resource` whose fields equal every pair in `filter`
    pub async fn list(&self, resource: &str, filter: &Filter) -> AppResult<Vec<Record>> {
        self.simulate_latency().await;
        let db = self.read().await?;

        if resource == AUDIT_RESOURCE {
            let mut records = Vec::new();
            for entry in &db.audit_logs {
                let record = Record::from_object(to_fields(entry)?)?;
                if record.matches(filter) {
                    records.push(record);
                }
            }
            return Ok(records);
        }

        Ok(db
            .collection(resource)
            .iter()
            .filter(|r| r.matches(filter))
            .cloned()
            .collect())
    }

    pub async fn get(&self, resource: &str, id: &str) -> AppResult<Option<Record>> {
        self.simulate_latency().await;
        let db = self.read().await?;

        if resource == AUDIT_RESOURCE {
            return db
                .audit_logs
                .iter()
                .find(|e| e.id == id)
                .map(|entry| Record::from_object(to_fields(entry)?))
                .transpose();
        }

        Ok(db.collection(resource).iter().find(|r| r.id == id).cloned())
    }

    /// Insert a new record at the head of `resource`
    ///
    /// Caller fields may override the timestamps but never the id.
    pub async fn create(
        &self,
        resource: &str,
        fields: Map<String, Value>,
        actor: Option<&str>,
    ) -> AppResult<Record> {
        validate_resource(resource)?;
        self.simulate_latency().await;
        let _guard = self.write_lock.lock().await;
        let mut db = self.read().await?;

        let now = self.clock.now();
        let mut object = Map::new();
        object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        object.insert("createdAt".to_string(), serde_json::to_value(now)?);
        object.insert("updatedAt".to_string(), serde_json::to_value(now)?);
        object.extend(fields.into_iter().filter(|(k, _)| k != "id"));
        let record = caller_record(object)?;

        db.collection_mut(resource).insert(0, record.clone());
        self.audit(&mut db, resource, AuditAction::Create, actor, Some(&record))?;
        self.write(&db).await?;

        tracing::debug!(resource, id = %record.id, "Record created");
        Ok(record)
    }

    /// Shallow-merge `patch` into an existing record
    pub async fn update(
        &self,
        resource: &str,
        id: &str,
        patch: Map<String, Value>,
        actor: Option<&str>,
    ) -> AppResult<Record> {
        validate_resource(resource)?;
        self.simulate_latency().await;
        let _guard = self.write_lock.lock().await;
        let mut db = self.read().await?;

        let rows = db.collection_mut(resource);
        let idx = rows
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("{} record {} not found", resource, id)))?;

        let mut object = rows[idx].to_object()?;
        object.extend(patch.into_iter().filter(|(k, _)| k != "id"));
        object.insert("updatedAt".to_string(), serde_json::to_value(self.clock.now())?);
        let record = caller_record(object)?;
        rows[idx] = record.clone();

        self.audit(&mut db, resource, AuditAction::Update, actor, Some(&record))?;
        self.write(&db).await?;

        tracing::debug!(resource, id, "Record updated");
        Ok(record)
    }

    /// Delete a record; deleting a missing id is not an error
    ///
    /// Returns the removed record, if there was one.
    pub async fn remove(
        &self,
        resource: &str,
        id: &str,
        actor: Option<&str>,
    ) -> AppResult<Option<Record>> {
        validate_resource(resource)?;
        self.simulate_latency().await;
        let _guard = self.write_lock.lock().await;
        let mut db = self.read().await?;

        let rows = db.collection_mut(resource);
        let previous = rows.iter().position(|r| r.id == id).map(|idx| rows.remove(idx));

        self.audit(&mut db, resource, AuditAction::Delete, actor, previous.as_ref())?;
        self.write(&db).await?;

        tracing::debug!(resource, id, found = previous.is_some(), "Record removed");
        Ok(previous)
    }

    /// Audit entries, newest first
    pub async fn audit_logs(&self, query: &AuditQuery) -> AppResult<Vec<AuditLogEntry>> {
        self.simulate_latency().await;
        let db = self.read().await?;
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(db
            .audit_logs
            .into_iter()
            .filter(|e| query.matches(e))
            .take(limit)
            .collect())
    }

    /// Typed view of a collection
    ///
    /// Records edited through the generic API may not fit `T`; those are
    /// skipped with a warning so one bad row cannot hide the rest.
    pub async fn list_as<T: Entity>(&self, filter: &Filter) -> AppResult<Vec<T>> {
        let records = self.list(T::RESOURCE, filter).await?;
        let mut typed = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.clone();
            match T::from_record(record) {
                Ok(value) => typed.push(value),
                Err(error) => {
                    tracing::warn!(resource = T::RESOURCE, %id, %error, "Skipping malformed record")
                }
            }
        }
        Ok(typed)
    }

    pub async fn get_as<T: Entity>(&self, id: &str) -> AppResult<Option<T>> {
        self.get(T::RESOURCE, id).await?.map(T::from_record).transpose()
    }

    pub async fn create_as<T: Entity, F: Serialize + ?Sized>(
        &self,
        fields: &F,
        actor: Option<&str>,
    ) -> AppResult<T> {
        T::from_record(self.create(T::RESOURCE, to_fields(fields)?, actor).await?)
    }

    pub async fn update_as<T: Entity, P: Serialize + ?Sized>(
        &self,
        id: &str,
        patch: &P,
        actor: Option<&str>,
    ) -> AppResult<T> {
        T::from_record(self.update(T::RESOURCE, id, to_fields(patch)?, actor).await?)
    }

    /// Write a whole blob if the store holds no records yet
    ///
    /// Bypasses the audit trail. Returns whether the blob was written.
    pub async fn initialize_if_empty(&self, seed: Database) -> AppResult<bool> {
        let _guard = self.write_lock.lock().await;
        let current = self.read().await?;
        if !current.is_empty() {
            return Ok(false);
        }
        self.write(&seed).await?;
        Ok(true)
    }

    async fn read(&self) -> AppResult<Database> {
        match self.storage.load::<Database>(&self.db_key).await? {
            Loaded::Found(db) => Ok(db),
            Loaded::Missing => Ok(Database::with_default_collections()),
            Loaded::Corrupted { error, .. } => {
                tracing::warn!(key = %self.db_key, %error, "Record blob is corrupted, starting from an empty store");
                Ok(Database::with_default_collections())
            }
        }
    }

    async fn write(&self, db: &Database) -> AppResult<()> {
        self.storage.set(&self.db_key, db).await
    }

    fn audit(
        &self,
        db: &mut Database,
        resource: &str,
        action: AuditAction,
        actor: Option<&str>,
        record: Option<&Record>,
    ) -> AppResult<()> {
        let data = record.map(serde_json::to_value).transpose()?;
        let entry = AuditLogEntry {
            id: Uuid::new_v4().to_string(),
            ts: self.clock.now(),
            resource: resource.to_string(),
            action,
            actor: actor.map(str::to_string),
            data,
        };
        db.push_audit(entry, self.audit_capacity);
        Ok(())
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Build a record from caller-supplied fields; bad managed fields are the caller's fault
fn caller_record(object: Map<String, Value>) -> AppResult<Record> {
    Record::from_object(object).map_err(|e| match e {
        AppError::Serialization(e) => AppError::Validation(format!("Invalid record fields: {}", e)),
        other => other,
    })
}

/// Resource names are plain identifiers; the audit collection is read-only
fn validate_resource(resource: &str) -> AppResult<()> {
    let valid = !resource.is_empty()
        && resource
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(AppError::Validation(format!("Invalid resource name '{}'", resource)));
    }
    if resource == AUDIT_RESOURCE {
        return Err(AppError::Validation("Audit logs are read-only".to_string()));
    }
    Ok(())
}
