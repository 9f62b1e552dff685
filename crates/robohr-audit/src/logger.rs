//! The command history logger.

use std::sync::Arc;

use crate::error::HistoryError;
use crate::event::CommandEvent;
use crate::storage::{HistoryStorage, MemoryStorage, NullStorage, create_storage};
use robohr_core::HistoryConfig;

/// Records one event per processed command.
#[derive(Clone)]
pub struct CommandLogger {
    enabled: bool,
    storage: Arc<dyn HistoryStorage>,
}

impl CommandLogger {
    pub fn new(config: &HistoryConfig) -> Result<Self, HistoryError> {
        Ok(Self {
            enabled: config.enabled,
            storage: Arc::from(create_storage(config)?),
        })
    }

    pub fn with_storage(storage: Arc<dyn HistoryStorage>) -> Self {
        Self {
            enabled: true,
            storage,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            storage: Arc::new(NullStorage),
        }
    }

    /// An enabled logger backed by a bounded in-memory buffer.
    pub fn in_memory(capacity: usize) -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new(capacity)))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub async fn log(&self, event: CommandEvent) -> Result<(), HistoryError> {
        if !self.enabled {
            return Ok(());
        }

        tracing::debug!(
            event_id = %event.event_id,
            role = %event.role,
            action = event.action.as_deref().unwrap_or("-"),
            success = event.success,
            response_time_ms = event.response_time_ms,
            "Command event"
        );

        self.storage.store(event).await
    }

    pub async fn query(&self, filter: HistoryFilter) -> Result<Vec<CommandEvent>, HistoryError> {
        self.storage.query(&filter).await
    }

    /// The latest commands issued by one employee.
    pub async fn recent_for_employee(
        &self,
        employee_id: i64,
        limit: usize,
    ) -> Result<Vec<CommandEvent>, HistoryError> {
        self.query(HistoryFilter {
            employee_id: Some(employee_id),
            limit: Some(limit),
            ..Default::default()
        })
        .await
    }
}

/// Filter for querying history.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub employee_id: Option<i64>,
    pub action: Option<String>,
    /// Only successes (`Some(true)`) or only failures (`Some(false)`).
    pub success: Option<bool>,
    pub limit: Option<usize>,
}

impl HistoryFilter {
    pub fn matches(&self, event: &CommandEvent) -> bool {
        if self.employee_id.is_some() && event.employee_id != self.employee_id {
            return false;
        }
        if let Some(ref action) = self.action {
            if event.action.as_ref() != Some(action) {
                return false;
            }
        }
        if let Some(success) = self.success {
            if event.success != success {
                return false;
            }
        }
        true
    }
}
