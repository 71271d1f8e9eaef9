use std::{
    collections::BTreeMap,
    ffi::OsString,
    future::Future,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};

use fs4::tokio::AsyncFileExt;
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Map, Value};
use tokio::fs::File;
use tracing::{debug, info};

use super::{entities::ProjectReport, error::HistoryError};

pub const DEFAULT_HISTORY_FILE: &str = "worktally_history.json";

/// Interface over the durable per-project history. Lets the tracking session be tested and
/// reused independently of the JSON file.
pub trait ProjectHistory {
    /// Stored report of `name`, or `None` if the project has never been written.
    fn get_project_report(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<ProjectReport>, HistoryError>>;

    /// Replaces the slot of `name` with `report`, keeping every other project as it was.
    fn merge_and_write(
        &self,
        name: &str,
        report: &ProjectReport,
    ) -> impl Future<Output = Result<(), HistoryError>>;
}

/// History kept as one JSON object in a file, keyed by project name.
///
/// Every change rewrites the whole document into a sibling temporary file which then replaces
/// the original, so the file on disk is always a complete document. Read-modify-write cycles
/// hold an exclusive lock on a sibling `.lock` file, which keeps several trackers sharing one
/// history from overwriting each other's sessions.
pub struct JsonHistoryStore {
    path: PathBuf,
    lock_path: PathBuf,
}

fn sibling(path: &Path, extension: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|v| v.to_os_string())
        .unwrap_or_else(|| OsString::from(DEFAULT_HISTORY_FILE));
    name.push(".");
    name.push(extension);
    path.with_file_name(name)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl JsonHistoryStore {
    /// Opens the history at `path`, creating an empty document if there is none yet.
    pub async fn open(path: PathBuf) -> Result<Self, HistoryError> {
        let store = Self {
            lock_path: sibling(&path, "lock"),
            path,
        };
        store.ensure_exists().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file containing `{}` if it's absent. Existing files are never touched.
    pub async fn ensure_exists(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|v| !v.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(HistoryError::io(parent))?;
        }

        let lock = self.lock(true).await?;
        let result = async {
            let exists = tokio::fs::try_exists(&self.path)
                .await
                .map_err(HistoryError::io(&self.path))?;
            if !exists {
                self.write_document(&Map::new()).await?;
                info!("Created history file {:?}", self.path);
            }
            Ok::<_, HistoryError>(())
        }
        .await;
        let unlocked = self.unlock(lock).await;
        result.and(unlocked)
    }

    /// Whole document. Reports of individual projects are left as raw JSON.
    pub async fn read_all(&self) -> Result<Map<String, Value>, HistoryError> {
        let lock = self.lock(false).await?;
        let result = self.read_document().await;
        let unlocked = self.unlock(lock).await;
        result.and_then(|v| unlocked.map(|_| v))
    }

    /// Every stored report, parsed. Fails if any of them is malformed.
    pub async fn read_reports(&self) -> Result<BTreeMap<String, ProjectReport>, HistoryError> {
        self.read_all()
            .await?
            .into_iter()
            .map(|(name, value)| match serde_json::from_value(value) {
                Ok(report) => Ok((name, report)),
                Err(source) => Err(HistoryError::MalformedReport { name, source }),
            })
            .collect()
    }

    async fn lock(&self, exclusive: bool) -> Result<File, HistoryError> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .await
            .map_err(HistoryError::io(&self.lock_path))?;
        if exclusive {
            file.lock_exclusive()
        } else {
            file.lock_shared()
        }
        .map_err(HistoryError::io(&self.lock_path))?;
        Ok(file)
    }

    async fn unlock(&self, file: File) -> Result<(), HistoryError> {
        file.unlock_async()
            .await
            .map_err(HistoryError::io(&self.lock_path))
    }

    /// Reads the document without locking. A missing file reads as an empty document.
    async fn read_document(&self) -> Result<Map<String, Value>, HistoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("History file {:?} is missing, treating as empty", self.path);
                return Ok(Map::new());
            }
            Err(e) => return Err(HistoryError::io(&self.path)(e)),
        };

        let value: Value =
            serde_json::from_str(&content).map_err(|e| HistoryError::CorruptHistory {
                path: self.path.clone(),
                details: e.to_string(),
            })?;

        match value {
            Value::Object(map) => Ok(map),
            other => Err(HistoryError::CorruptHistory {
                path: self.path.clone(),
                details: format!("expected an object at the top level, found {}", json_kind(&other)),
            }),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> Result<(), HistoryError> {
        let mut buffer = Vec::<u8>::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        document.serialize(&mut serializer)?;
        buffer.push(b'\n');

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || replace_file(&path, &buffer))
            .await
            .map_err(|e| HistoryError::io(&self.path)(io::Error::other(e)))?
    }
}

/// Writes `content` into a temporary file next to `path` and moves it over `path`. The
/// temporary file is deleted whenever a step before the move fails.
fn replace_file(path: &Path, content: &[u8]) -> Result<(), HistoryError> {
    let dir = path
        .parent()
        .filter(|v| !v.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .map(|v| v.to_os_string())
        .unwrap_or_else(|| OsString::from(DEFAULT_HISTORY_FILE));

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(HistoryError::io(dir))?;
    tmp.write_all(content).map_err(HistoryError::io(tmp.path()))?;
    tmp.as_file()
        .sync_all()
        .map_err(HistoryError::io(tmp.path()))?;

    tmp.persist(path)
        .map(|_| ())
        .map_err(|e| HistoryError::io(path)(e.error))
}

impl ProjectHistory for JsonHistoryStore {
    async fn get_project_report(&self, name: &str) -> Result<Option<ProjectReport>, HistoryError> {
        self.read_all()
            .await?
            .remove(name)
            .map(|value| {
                serde_json::from_value(value).map_err(|source| HistoryError::MalformedReport {
                    name: name.to_string(),
                    source,
                })
            })
            .transpose()
    }

    async fn merge_and_write(&self, name: &str, report: &ProjectReport) -> Result<(), HistoryError> {
        let value = serde_json::to_value(report)?;

        let lock = self.lock(true).await?;
        let result = async {
            let mut document = self.read_document().await?;
            document.insert(name.to_string(), value);
            self.write_document(&document).await
        }
        .await;
        let unlocked = self.unlock(lock).await;

        result
            .and(unlocked)
            .inspect(|_| debug!("Wrote report of {name:?} into {:?}", self.path))
    }
}
