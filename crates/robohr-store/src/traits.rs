//! Store traits consumed by the action handlers.

use crate::error::StoreError;
use crate::records::{
    AttendanceRecord, Employee, LeaveRequest, NewLeaveRequest, NewPayrollEntry, PayrollEntry,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Look up an employee by id.
    async fn get(&self, id: i64) -> Result<Option<Employee>, StoreError>;

    /// Employees whose name matches `name`, in the store's natural (id) order.
    async fn find_by_name(&self, name: &str) -> Result<Vec<Employee>, StoreError>;

    /// All employees, optionally restricted to one department (case-insensitive).
    async fn list(&self, department: Option<&str>) -> Result<Vec<Employee>, StoreError>;
}

#[async_trait]
pub trait AttendanceLedger: Send + Sync {
    /// Open today's attendance record. Rejected while a record of the same day is open.
    async fn clock_in(&self, employee_id: i64, at: NaiveDateTime) -> Result<AttendanceRecord, StoreError>;

    /// Close the open attendance record of the day of `at`.
    async fn clock_out(&self, employee_id: i64, at: NaiveDateTime) -> Result<AttendanceRecord, StoreError>;

    /// Most recent records first.
    async fn recent(&self, employee_id: i64, limit: usize) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Records of one day, most recent first.
    async fn on_date(&self, employee_id: i64, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError>;
}

#[async_trait]
pub trait LeaveRequests: Send + Sync {
    /// Store a new request with status `pending`.
    async fn submit(&self, request: NewLeaveRequest) -> Result<LeaveRequest, StoreError>;

    /// Most recent requests first.
    async fn for_employee(&self, employee_id: i64, limit: usize) -> Result<Vec<LeaveRequest>, StoreError>;
}

#[async_trait]
pub trait PayrollLedger: Send + Sync {
    /// Most recent entries first (by year, then month).
    async fn recent(&self, employee_id: i64, limit: usize) -> Result<Vec<PayrollEntry>, StoreError>;

    /// Store a new entry. Rejected when the month is already on the ledger.
    async fn insert(&self, entry: NewPayrollEntry) -> Result<PayrollEntry, StoreError>;
}

/// Handles to every domain store the handlers may touch.
#[derive(Clone)]
pub struct Stores {
    pub employees: Arc<dyn EmployeeDirectory>,
    pub attendance: Arc<dyn AttendanceLedger>,
    pub leave: Arc<dyn LeaveRequests>,
    pub payroll: Arc<dyn PayrollLedger>,
}

impl Stores {
    /// Use one backend for all four domains.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: EmployeeDirectory + AttendanceLedger + LeaveRequests + PayrollLedger + 'static,
    {
        Self {
            employees: store.clone(),
            attendance: store.clone(),
            leave: store.clone(),
            payroll: store,
        }
    }
}
