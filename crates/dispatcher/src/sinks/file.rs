//! FileSink - appends envelopes to a JSON lines file per project

use chrono::{DateTime, Utc};
use contracts::{ContractError, Dsn, Envelope, EnvelopeSink};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

/// One line of output
#[derive(Serialize)]
struct FileRecord<'a> {
    received_at: DateTime<Utc>,
    project_id: &'a str,
    envelope: &'a Envelope,
}

/// Sink that appends envelopes to `{base_path}/{project_id}.jsonl`
pub struct FileSink {
    name: String,
    project_id: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create a new FileSink; the file is opened in append mode
    pub fn new(name: impl Into<String>, dsn: &Dsn, config: FileSinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;

        let project_id = dsn.project_id().to_string();
        let path = config.base_path.join(format!("{project_id}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            name: name.into(),
            project_id,
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        dsn: &Dsn,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, dsn, config)
    }

    /// Output file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, ContractError> {
        self.writer
            .as_mut()
            .ok_or_else(|| ContractError::sink_write(&self.name, "file already closed"))
    }

    fn append_record(&mut self, envelope: &Envelope) -> Result<(), ContractError> {
        let record = FileRecord {
            received_at: Utc::now(),
            project_id: &self.project_id,
            envelope,
        };
        let mut line = serde_json::to_vec(&record)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        line.push(b'\n');

        let name = self.name.clone();
        self.writer()?.write_all(&line).map_err(|e| {
            error!(sink = %name, error = %e, "Write failed");
            ContractError::sink_write(&name, e.to_string())
        })
    }
}

impl EnvelopeSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, envelope),
        fields(sink = %self.name, project_id = %self.project_id)
    )]
    async fn write(&mut self, envelope: &Envelope) -> Result<(), ContractError> {
        self.append_record(envelope)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        let name = self.name.clone();
        match self.writer.as_mut() {
            Some(writer) => writer
                .flush()
                .map_err(|e| ContractError::sink_write(name, e.to_string())),
            None => Ok(()),
        }
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(sink = %self.name, path = %self.path.display(), "FileSink closed");
        Ok(())
    }
}
