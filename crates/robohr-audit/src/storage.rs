//! History storage backends.

use crate::error::HistoryError;
use crate::event::CommandEvent;
use crate::logger::HistoryFilter;
use async_trait::async_trait;
use robohr_core::{HistoryBackend, HistoryConfig};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[async_trait]
pub trait HistoryStorage: Send + Sync {
    async fn store(&self, event: CommandEvent) -> Result<(), HistoryError>;

    /// Matching events, newest first.
    async fn query(&self, filter: &HistoryFilter) -> Result<Vec<CommandEvent>, HistoryError>;
}

/// Create a storage backend from configuration.
pub fn create_storage(config: &HistoryConfig) -> Result<Box<dyn HistoryStorage>, HistoryError> {
    if !config.enabled {
        return Ok(Box::new(NullStorage));
    }
    match config.backend {
        HistoryBackend::Null => Ok(Box::new(NullStorage)),
        HistoryBackend::Console => Ok(Box::new(ConsoleStorage)),
        HistoryBackend::Memory => Ok(Box::new(MemoryStorage::new(config.capacity))),
        HistoryBackend::File => {
            let path = config.file_path.as_deref().ok_or_else(|| {
                HistoryError::InitializationFailed("file backend requires file_path".to_string())
            })?;
            Ok(Box::new(FileStorage::new(path, config.capacity)?))
        }
    }
}

pub struct NullStorage;

#[async_trait]
impl HistoryStorage for NullStorage {
    async fn store(&self, _event: CommandEvent) -> Result<(), HistoryError> {
        Ok(())
    }

    async fn query(&self, _filter: &HistoryFilter) -> Result<Vec<CommandEvent>, HistoryError> {
        Ok(vec![])
    }
}

/// Writes one JSON line per event to stdout.
pub struct ConsoleStorage;

#[async_trait]
impl HistoryStorage for ConsoleStorage {
    async fn store(&self, event: CommandEvent) -> Result<(), HistoryError> {
        let json = serde_json::to_string(&event)?;
        println!("{}", json);
        Ok(())
    }

    async fn query(&self, _filter: &HistoryFilter) -> Result<Vec<CommandEvent>, HistoryError> {
        // Console output cannot be read back
        Ok(vec![])
    }
}

/// Bounded in-memory buffer. The oldest events are evicted first.
pub struct MemoryStorage {
    capacity: usize,
    events: RwLock<VecDeque<CommandEvent>>,
}

impl MemoryStorage {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: RwLock::new(VecDeque::new()),
        }
    }

    fn push(&self, event: CommandEvent) -> Result<(), HistoryError> {
        let mut events = self.events.write().map_err(|e| {
            HistoryError::StorageError(format!("Failed to acquire write lock: {}", e))
        })?;
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        Ok(())
    }

    fn matching(&self, filter: &HistoryFilter) -> Result<Vec<CommandEvent>, HistoryError> {
        let events = self.events.read().map_err(|e| {
            HistoryError::StorageError(format!("Failed to acquire read lock: {}", e))
        })?;
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(events
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl HistoryStorage for MemoryStorage {
    async fn store(&self, event: CommandEvent) -> Result<(), HistoryError> {
        self.push(event)
    }

    async fn query(&self, filter: &HistoryFilter) -> Result<Vec<CommandEvent>, HistoryError> {
        self.matching(filter)
    }
}

/// Appends JSON lines to a file and keeps the latest events in memory for queries.
pub struct FileStorage {
    path: PathBuf,
    recent: MemoryStorage,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>, capacity: usize) -> Result<Self, HistoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            recent: MemoryStorage::new(capacity),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryStorage for FileStorage {
    async fn store(&self, event: CommandEvent) -> Result<(), HistoryError> {
        let json = serde_json::to_string(&event)?;

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", json)?;

        self.recent.push(event)
    }

    async fn query(&self, filter: &HistoryFilter) -> Result<Vec<CommandEvent>, HistoryError> {
        self.recent.matching(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::InputKind;
    use robohr_core::Role;

    fn event(employee_id: i64, action: &str) -> CommandEvent {
        CommandEvent::builder(Role::Employee, "en", InputKind::Text)
            .employee_id(Some(employee_id))
            .action(action)
            .outcome(None)
            .build()
    }

    #[tokio::test]
    async fn test_memory_storage_evicts_oldest() {
        let storage = MemoryStorage::new(2);
        storage.store(event(1, "clock_in")).await.unwrap();
        storage.store(event(1, "clock_out")).await.unwrap();
        storage.store(event(1, "view_leave")).await.unwrap();

        let all = storage.query(&HistoryFilter::default()).await.unwrap();
        let actions: Vec<_> = all.iter().filter_map(|e| e.action.as_deref()).collect();
        assert_eq!(actions, vec!["view_leave", "clock_out"]);
    }

    #[tokio::test]
    async fn test_file_storage_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.jsonl");
        let storage = FileStorage::new(&path, 10).unwrap();

        storage.store(event(1, "clock_in")).await.unwrap();
        storage.store(event(2, "view_payroll")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: CommandEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.action.as_deref(), Some("view_payroll"));

        let filter = HistoryFilter {
            employee_id: Some(1),
            ..Default::default()
        };
        assert_eq!(storage.query(&filter).await.unwrap().len(), 1);
    }

    #[test]
    fn test_create_storage_requires_file_path() {
        let config = HistoryConfig {
            backend: HistoryBackend::File,
            file_path: None,
            ..Default::default()
        };
        assert!(matches!(
            create_storage(&config),
            Err(HistoryError::InitializationFailed(_))
        ));
    }
}
