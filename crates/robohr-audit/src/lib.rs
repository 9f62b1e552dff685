//! # robohr-audit
//!
//! Command history for the RoboHR command pipeline.
//!
//! Every command that reaches the gateway produces one [`CommandEvent`]:
//! who asked, what was recognized, whether it succeeded, and how long it
//! took. Events go to a pluggable [`HistoryStorage`]:
//!
//! | Backend | Output |
//! |---------|--------|
//! | `null` | discarded |
//! | `console` | JSON lines on stdout |
//! | `file` | JSON lines appended to a file |
//! | `memory` | bounded in-memory buffer, queryable |
//!
//! Recording history never affects the outcome of a command; storage
//! failures are logged and dropped by the caller.

pub mod error;
pub mod event;
pub mod logger;
pub mod storage;

pub use error::HistoryError;
pub use event::{CommandEvent, CommandEventBuilder, InputKind};
pub use logger::{CommandLogger, HistoryFilter};
pub use storage::{
    ConsoleStorage, FileStorage, HistoryStorage, MemoryStorage, NullStorage, create_storage,
};
