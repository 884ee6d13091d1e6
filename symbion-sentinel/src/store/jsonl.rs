use super::{DailyAggregate, History, Store, StoreError};
use crate::models::{Outcome, ProbeKind, Severity, SystemSample, TestResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// One line of the history file
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Record {
    Result(TestResult),
    Sample(SystemSample),
}

/// Append-only JSON lines history.
///
/// The file is replayed on open, keeping only the retention window in
/// memory; lookups never touch disk. The file itself is never truncated.
pub struct JsonlStore {
    path: PathBuf,
    history: Mutex<History>,
}

impl JsonlStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut history = History::default();
        if path.exists() {
            let file = tokio::fs::File::open(&path).await?;
            let mut lines = BufReader::new(file).lines();
            let mut skipped = 0usize;
            let mut line_no = 0usize;
            while let Some(line) = lines.next_line().await? {
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<Record>(&line) {
                    Ok(Record::Result(result)) => history.push_result(result),
                    Ok(Record::Sample(sample)) => history.push_sample(sample),
                    Err(e) => {
                        skipped += 1;
                        warn!(path = %path.display(), line = line_no, error = %e, "skipping corrupt history line");
                    }
                }
            }
            let (results, samples) = history.len();
            info!(path = %path.display(), results, samples, skipped, "history replayed");
        }

        Ok(Self {
            path,
            history: Mutex::new(history),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_line(&self, record: &Record) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonlStore {
    async fn append_result(&self, result: &TestResult) -> Result<(), StoreError> {
        let mut history = self.history.lock().await;
        let record = Record::Result(result.clone());
        self.write_line(&record).await?;
        history.push_result(result.clone());
        Ok(())
    }

    async fn append_sample(&self, sample: &SystemSample) -> Result<(), StoreError> {
        let mut history = self.history.lock().await;
        let record = Record::Sample(sample.clone());
        self.write_line(&record).await?;
        history.push_sample(sample.clone());
        Ok(())
    }

    async fn last_status(&self, kind: ProbeKind, address: &str) -> Result<Option<Outcome>, StoreError> {
        Ok(self.history.lock().await.last_status(kind, address))
    }

    async fn last_system_severity(&self) -> Result<Option<Severity>, StoreError> {
        Ok(self.history.lock().await.last_system_severity())
    }

    async fn daily_aggregate(&self, date: NaiveDate) -> Result<DailyAggregate, StoreError> {
        Ok(self.history.lock().await.daily_aggregate(date))
    }
}
