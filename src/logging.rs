use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Analyze,
    Translate,
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOutcome {
    Ok,
    Rejected,
    Error,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub ts: String,
    pub id: String,
    pub action: HistoryAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub input_chars: usize,
    pub relevant: bool,
    pub outcome: HistoryOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryEntry {
    pub fn new(action: HistoryAction, input: &str, outcome: HistoryOutcome) -> Self {
        Self {
            ts: Utc::now().to_rfc3339(),
            id: Uuid::new_v4().to_string(),
            action,
            language: None,
            input_chars: input.chars().count(),
            relevant: crate::relevance::is_relevant(input),
            outcome,
            error: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_error(mut self, error: impl ToString) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Appends one JSON line per operation to the history file from a background task.
pub struct HistoryLogger {
    tx: mpsc::UnboundedSender<HistoryEntry>,
    writer: JoinHandle<()>,
}

impl HistoryLogger {
    pub fn new(log_path: PathBuf, max_size_mb: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(Self::writer_task(rx, log_path, max_size_mb));
        Self { tx, writer }
    }

    pub fn log(&self, entry: HistoryEntry) {
        if let Err(e) = self.tx.send(entry) {
            tracing::warn!("Failed to send history entry: {e}");
        }
    }

    /// Wait for queued entries to reach the file.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.writer.await {
            tracing::warn!("History writer task failed: {e}");
        }
    }

    async fn writer_task(
        mut rx: mpsc::UnboundedReceiver<HistoryEntry>,
        log_path: PathBuf,
        max_size_mb: u64,
    ) {
        use std::io::Write;

        if let Some(parent) = log_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::error!("Failed to create history directory: {e}");
                return;
            }
        }

        while let Some(entry) = rx.recv().await {
            if let Ok(meta) = std::fs::metadata(&log_path) {
                if meta.len() > max_size_mb * 1024 * 1024 {
                    let rotated = log_path.with_extension("jsonl.1");
                    if let Err(e) = std::fs::rename(&log_path, &rotated) {
                        tracing::warn!("Failed to rotate history: {e}");
                    }
                }
            }

            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
            {
                Ok(mut file) => {
                    if let Ok(json) = serde_json::to_string(&entry) {
                        if let Err(e) = writeln!(file, "{json}") {
                            tracing::warn!("Failed to write history entry: {e}");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to open history file: {e}");
                }
            }
        }
    }
}
