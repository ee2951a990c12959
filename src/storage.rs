use crate::profile::{Options, Profile};
use crate::utils::extract_host_from_url;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use ts_rs::TS;

/// Job-form log entries older than this are dropped by `cleanup`.
pub const JOB_FORM_MAX_AGE_SECS: i64 = 60 * 60;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse {
    pub question: String,
    pub response: String,
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

/// Generated answers keyed by question id.
pub type ResponseCache = BTreeMap<String, AiResponse>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct JobFormRecord {
    pub url: String,
    pub host: String,
    pub form_found: bool,
    pub timestamp: DateTime<Utc>,
}

/// Pages checked for an application form, keyed by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobFormLog {
    records: BTreeMap<String, JobFormRecord>,
}

impl JobFormLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, url: &str, form_found: bool) -> JobFormRecord {
        self.record_at(url, form_found, Utc::now())
    }

    /// Inserts or replaces the entry for `url`.
    pub fn record_at(&mut self, url: &str, form_found: bool, timestamp: DateTime<Utc>) -> JobFormRecord {
        let record = JobFormRecord {
            url: url.to_string(),
            host: extract_host_from_url(url).unwrap_or_else(|| "unknown".to_string()),
            form_found,
            timestamp,
        };
        self.records.insert(url.to_string(), record.clone());
        record
    }

    pub fn get(&self, url: &str) -> Option<&JobFormRecord> {
        self.records.get(url)
    }

    pub fn by_host(&self, host: &str) -> Vec<&JobFormRecord> {
        self.records
            .values()
            .filter(|record| record.host == host)
            .collect()
    }

    /// Drops entries recorded more than `max_age` before `now`; returns how many.
    pub fn cleanup_older_than(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| now - record.timestamp <= max_age);
        before - self.records.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Everything the assistant persists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreData {
    pub options: Options,
    pub profile: Profile,
    pub ai_responses: ResponseCache,
    pub job_forms: JobFormLog,
}

pub type StoreUpdate = Box<dyn FnOnce(&mut StoreData) + Send>;

/// Key-value persistence for the profile, options and bookkeeping.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Current contents; defaults when nothing was stored yet.
    /// This method MUST be implemented by concrete types.
    async fn load(&self) -> Result<StoreData, StorageError>;

    /// Applies `apply` as one read-modify-write step.
    /// This method MUST be implemented by concrete types.
    async fn update(&self, apply: StoreUpdate) -> Result<(), StorageError>;

    async fn get_profile(&self) -> Result<Profile, StorageError> {
        Ok(self.load().await?.profile)
    }

    async fn save_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let profile = profile.clone();
        self.update(Box::new(move |data: &mut StoreData| data.profile = profile)).await
    }

    async fn get_options(&self) -> Result<Options, StorageError> {
        Ok(self.load().await?.options)
    }

    async fn save_options(&self, options: &Options) -> Result<(), StorageError> {
        let options = options.clone();
        self.update(Box::new(move |data: &mut StoreData| data.options = options)).await
    }

    async fn save_ai_response(&self, question_id: &str, response: AiResponse) -> Result<(), StorageError> {
        let question_id = question_id.to_string();
        self.update(Box::new(move |data: &mut StoreData| {
            data.ai_responses.insert(question_id, response);
        }))
        .await
    }

    async fn record_job_form(&self, url: &str, form_found: bool) -> Result<(), StorageError> {
        let url = url.to_string();
        self.update(Box::new(move |data: &mut StoreData| {
            data.job_forms.record(&url, form_found);
        }))
        .await
    }

    async fn job_form(&self, url: &str) -> Result<Option<JobFormRecord>, StorageError> {
        Ok(self.load().await?.job_forms.get(url).cloned())
    }

    /// Forgets job-form entries older than an hour.
    async fn cleanup(&self) -> Result<(), StorageError> {
        self.update(Box::new(|data: &mut StoreData| {
            let removed = data
                .job_forms
                .cleanup_older_than(Duration::seconds(JOB_FORM_MAX_AGE_SECS), Utc::now());
            if removed > 0 {
                info!("Removed {} stale job-form record(s)", removed);
            }
        }))
        .await
    }
}

/// Store backed by a single JSON file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<StoreData, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(StoreData::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No store at {}, using defaults", self.path.display());
                Ok(StoreData::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, data: &StoreData) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for JsonFileStore {
    async fn load(&self) -> Result<StoreData, StorageError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn update(&self, apply: StoreUpdate) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut data = self.read().await?;
        apply(&mut data);
        self.write(&data).await
    }
}

/// Store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new(data: StoreData) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn load(&self) -> Result<StoreData, StorageError> {
        Ok(self.data.lock().await.clone())
    }

    async fn update(&self, apply: StoreUpdate) -> Result<(), StorageError> {
        apply(&mut *self.data.lock().await);
        Ok(())
    }
}
