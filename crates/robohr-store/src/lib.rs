//! # robohr-store
//!
//! Data-access seam between the command pipeline and the HR records.
//!
//! Each domain exposes a small async trait. Implementations must report
//! business-rule refusals as [`StoreError::Rejected`] with a reason that can be
//! shown to the end user verbatim; anything else is a backend fault.
//!
//! The crate ships an in-memory implementation ([`InMemoryStore`]) used for
//! development and tests. The PostgreSQL implementation lives in
//! `robohr-adapter-pg`.

pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::StoreError;
pub use memory::{InMemoryStore, demo_employees};
pub use records::{
    AttendanceRecord, Employee, LeaveRequest, LeaveStatus, NewEmployee, NewLeaveRequest,
    NewPayrollEntry, PayrollEntry,
};
pub use traits::{AttendanceLedger, EmployeeDirectory, LeaveRequests, PayrollLedger, Stores};
