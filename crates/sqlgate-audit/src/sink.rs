//! Audit sinks.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use sqlgate_core::AuditConfig;

use crate::error::AuditError;
use crate::record::AuditRecord;

/// Destination for audit records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Write one record.
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Create the sink described by configuration.
///
/// A disabled recorder, or one with no destination, gets a [`NullSink`].
pub fn create_sink(config: &AuditConfig) -> Result<Box<dyn AuditSink>, AuditError> {
    if !config.enabled {
        return Ok(Box::new(NullSink));
    }
    match (&config.file, config.stdout) {
        (Some(path), true) => Ok(Box::new(DualSink::new(path)?)),
        (Some(path), false) => Ok(Box::new(FileSink::new(path)?)),
        (None, true) => Ok(Box::new(ConsoleSink)),
        (None, false) => {
            tracing::debug!("Audit enabled without a destination, records are dropped");
            Ok(Box::new(NullSink))
        }
    }
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl AuditSink for NullSink {
    async fn write(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Prints each record as a JSON line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

#[async_trait]
impl AuditSink for ConsoleSink {
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let json = serde_json::to_string(record)?;
        println!("{}", json);
        Ok(())
    }
}

/// Appends records as JSON Lines to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    // Serializes appends so concurrent records never interleave.
    lock: Arc<Mutex<()>>,
}

impl FileSink {
    /// Create a file sink. The file is created if missing so a bad path fails here
    /// rather than on the first record.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                AuditError::InitializationFailed(format!(
                    "cannot open audit file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        Ok(Self {
            path,
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for FileSink {
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let json = serde_json::to_string(record)?;
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);

        // Blocking file I/O stays off the async workers.
        tokio::task::spawn_blocking(move || append_line(&path, &lock, &json))
            .await
            .map_err(|e| AuditError::SinkError(format!("audit file writer failed: {}", e)))?
    }
}

fn append_line(path: &Path, lock: &Mutex<()>, line: &str) -> Result<(), AuditError> {
    let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}

/// Keeps records in memory. Useful for tests and inspection.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written so far, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }
}

/// File and console output together.
#[derive(Debug)]
pub struct DualSink {
    file: FileSink,
    console: ConsoleSink,
}

impl DualSink {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Ok(Self {
            file: FileSink::new(path)?,
            console: ConsoleSink,
        })
    }
}

#[async_trait]
impl AuditSink for DualSink {
    async fn write(&self, record: &AuditRecord) -> Result<(), AuditError> {
        // Console output still happens when the file write fails.
        let file_result = self.file.write(record).await;
        self.console.write(record).await?;
        file_result
    }
}
