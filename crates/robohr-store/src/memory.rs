//! Process-local store implementing every domain trait.
//!
//! Used for development, the offline CLI and tests. Ids are assigned
//! sequentially per table starting at 1.

use crate::error::StoreError;
use crate::records::{
    AttendanceRecord, Employee, LeaveRequest, LeaveStatus, NewEmployee, NewLeaveRequest,
    NewPayrollEntry, PayrollEntry,
};
use crate::traits::{AttendanceLedger, EmployeeDirectory, LeaveRequests, PayrollLedger};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Seven sample directory entries used by development setups.
pub fn demo_employees() -> Vec<NewEmployee> {
    [
        ("Alice", "Johnson", "Engineering", "Engineering Manager", 120_000.0),
        ("Bob", "Smith", "Human Resources", "HR Specialist", 65_000.0),
        ("Carol", "Davis", "Finance", "Accountant", 70_000.0),
        ("John", "Miller", "Sales", "Account Executive", 60_000.0),
        ("John", "Walker", "Engineering", "Software Engineer", 95_000.0),
        ("Maria", "Garcia", "Marketing", "Marketing Lead", 82_000.0),
        ("David", "Lee", "Engineering", "Software Engineer", 90_000.0),
    ]
    .into_iter()
    .map(|(first, last, department, position, salary)| NewEmployee {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}.{}@robohr.local", first.to_lowercase(), last.to_lowercase()),
        department: Some(department.to_string()),
        position: Some(position.to_string()),
        salary,
        hire_date: NaiveDate::from_ymd_opt(2022, 1, 10),
    })
    .collect()
}

#[derive(Default)]
struct Tables {
    employees: Vec<Employee>,
    attendance: Vec<AttendanceRecord>,
    leave: Vec<LeaveRequest>,
    payroll: Vec<PayrollEntry>,
}

impl Tables {
    fn employee_exists(&self, id: i64) -> bool {
        self.employees.iter().any(|e| e.id == id)
    }

    fn require_employee(&self, id: i64) -> Result<(), StoreError> {
        if self.employee_exists(id) {
            Ok(())
        } else {
            Err(StoreError::rejected(format!("Employee {} does not exist", id)))
        }
    }
}

/// In-memory store for all four HR domains.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with [`demo_employees`] (ids 1 to 7).
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        for employee in demo_employees() {
            // Seeding an empty store cannot fail.
            let _ = store.add_employee(employee);
        }
        store
    }

    /// Add a directory entry.
    pub fn add_employee(&self, employee: NewEmployee) -> Result<Employee, StoreError> {
        let mut tables = self.write()?;
        let record = Employee {
            id: tables.employees.len() as i64 + 1,
            first_name: employee.first_name,
            last_name: employee.last_name,
            email: employee.email,
            department: employee.department,
            position: employee.position,
            salary: employee.salary,
            hire_date: employee.hire_date,
            status: "active".to_string(),
        };
        tables.employees.push(record.clone());
        Ok(record)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|e| StoreError::backend(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|e| StoreError::backend(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Employee>, StoreError> {
        Ok(self.read()?.employees.iter().find(|e| e.id == id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Employee>, StoreError> {
        Ok(self
            .read()?
            .employees
            .iter()
            .filter(|e| e.matches_name(name))
            .cloned()
            .collect())
    }

    async fn list(&self, department: Option<&str>) -> Result<Vec<Employee>, StoreError> {
        Ok(self
            .read()?
            .employees
            .iter()
            .filter(|e| match department {
                Some(wanted) => e
                    .department
                    .as_deref()
                    .is_some_and(|d| d.eq_ignore_ascii_case(wanted.trim())),
                None => true,
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttendanceLedger for InMemoryStore {
    async fn clock_in(&self, employee_id: i64, at: NaiveDateTime) -> Result<AttendanceRecord, StoreError> {
        let mut tables = self.write()?;
        tables.require_employee(employee_id)?;

        let date = at.date();
        if tables
            .attendance
            .iter()
            .any(|r| r.employee_id == employee_id && r.date == date && r.is_open())
        {
            return Err(StoreError::rejected("Employee is already clocked in"));
        }

        let record = AttendanceRecord {
            id: tables.attendance.len() as i64 + 1,
            employee_id,
            date,
            clock_in: at,
            clock_out: None,
            hours_worked: None,
        };
        tables.attendance.push(record.clone());
        Ok(record)
    }

    async fn clock_out(&self, employee_id: i64, at: NaiveDateTime) -> Result<AttendanceRecord, StoreError> {
        let mut tables = self.write()?;
        let date = at.date();
        let record = tables
            .attendance
            .iter_mut()
            .rev()
            .find(|r| r.employee_id == employee_id && r.date == date && r.is_open())
            .ok_or_else(|| StoreError::rejected("Employee is not clocked in"))?;

        record.clock_out = Some(at);
        record.hours_worked = Some(hours_between(record.clock_in, at));
        Ok(record.clone())
    }

    async fn recent(&self, employee_id: i64, limit: usize) -> Result<Vec<AttendanceRecord>, StoreError> {
        let tables = self.read()?;
        let mut records: Vec<_> = tables
            .attendance
            .iter()
            .filter(|r| r.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }

    async fn on_date(&self, employee_id: i64, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError> {
        let tables = self.read()?;
        let mut records: Vec<_> = tables
            .attendance
            .iter()
            .filter(|r| r.employee_id == employee_id && r.date == date)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(records)
    }
}

#[async_trait]
impl LeaveRequests for InMemoryStore {
    async fn submit(&self, request: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        let mut tables = self.write()?;
        tables.require_employee(request.employee_id)?;

        if request.end_date < request.start_date {
            return Err(StoreError::rejected(
                "Leave end date cannot be before the start date",
            ));
        }

        let overlaps = tables.leave.iter().any(|l| {
            l.employee_id == request.employee_id
                && l.status != LeaveStatus::Rejected
                && l.start_date <= request.end_date
                && request.start_date <= l.end_date
        });
        if overlaps {
            return Err(StoreError::rejected(
                "Leave request overlaps an existing leave request",
            ));
        }

        let record = LeaveRequest {
            id: tables.leave.len() as i64 + 1,
            employee_id: request.employee_id,
            start_date: request.start_date,
            end_date: request.end_date,
            leave_type: request.leave_type,
            reason: request.reason,
            status: LeaveStatus::Pending,
            created_at: Utc::now(),
        };
        tables.leave.push(record.clone());
        Ok(record)
    }

    async fn for_employee(&self, employee_id: i64, limit: usize) -> Result<Vec<LeaveRequest>, StoreError> {
        let tables = self.read()?;
        let mut records: Vec<_> = tables
            .leave
            .iter()
            .filter(|l| l.employee_id == employee_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }
}

#[async_trait]
impl PayrollLedger for InMemoryStore {
    async fn recent(&self, employee_id: i64, limit: usize) -> Result<Vec<PayrollEntry>, StoreError> {
        let tables = self.read()?;
        let mut entries: Vec<_> = tables
            .payroll
            .iter()
            .filter(|p| p.employee_id == employee_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| (b.year, b.month).cmp(&(a.year, a.month)));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn insert(&self, entry: NewPayrollEntry) -> Result<PayrollEntry, StoreError> {
        let mut tables = self.write()?;
        tables.require_employee(entry.employee_id)?;

        if !(1..=12).contains(&entry.month) {
            return Err(StoreError::rejected(format!("Invalid payroll month {}", entry.month)));
        }
        if tables.payroll.iter().any(|p| {
            p.employee_id == entry.employee_id && p.month == entry.month && p.year == entry.year
        }) {
            return Err(StoreError::rejected(format!(
                "Payroll for {:02}/{} already exists",
                entry.month, entry.year
            )));
        }

        let record = PayrollEntry {
            id: tables.payroll.len() as i64 + 1,
            employee_id: entry.employee_id,
            month: entry.month,
            year: entry.year,
            net_salary: entry.net_salary(),
            basic_salary: entry.basic_salary,
            allowances: entry.allowances,
            deductions: entry.deductions,
            status: "generated".to_string(),
            created_at: Utc::now(),
        };
        tables.payroll.push(record.clone());
        Ok(record)
    }
}

fn hours_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    let minutes = (to - from).num_minutes().max(0) as f64;
    (minutes / 60.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_demo_data() {
        let store = InMemoryStore::with_demo_data();
        let all = store.list(None).await.unwrap();
        assert_eq!(all.len(), 7);
        assert_eq!(store.get(7).await.unwrap().unwrap().first_name, "David");

        let engineering = store.list(Some("engineering")).await.unwrap();
        assert_eq!(engineering.len(), 3);
    }

    #[tokio::test]
    async fn test_find_by_name_keeps_id_order() {
        let store = InMemoryStore::with_demo_data();
        let johns = store.find_by_name("john").await.unwrap();
        // "John Miller", "John Walker" and "Alice Johnson" all match
        assert_eq!(johns.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 4, 5]);

        let exact = store.find_by_name("John Walker").await.unwrap();
        assert_eq!(exact.len(), 1);
        assert!(store.find_by_name("Nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clock_in_twice_is_rejected() {
        let store = InMemoryStore::with_demo_data();
        store.clock_in(7, at("2026-10-19", "09:00:00")).await.unwrap();

        let err = store
            .clock_in(7, at("2026-10-19", "09:05:00"))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::rejected("Employee is already clocked in"));
    }

    #[tokio::test]
    async fn test_clock_out_closes_record() {
        let store = InMemoryStore::with_demo_data();
        store.clock_in(7, at("2026-10-19", "09:00:00")).await.unwrap();
        let record = store.clock_out(7, at("2026-10-19", "17:30:00")).await.unwrap();
        assert_eq!(record.hours_worked, Some(8.5));

        let err = store.clock_out(7, at("2026-10-19", "18:00:00")).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        // A new shift may start after the previous one closed.
        store.clock_in(7, at("2026-10-19", "19:00:00")).await.unwrap();
        assert_eq!(AttendanceLedger::recent(&store, 7, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_clock_in_unknown_employee() {
        let store = InMemoryStore::new();
        let err = store.clock_in(42, at("2026-10-19", "09:00:00")).await.unwrap_err();
        assert_eq!(err, StoreError::rejected("Employee 42 does not exist"));
    }

    #[tokio::test]
    async fn test_leave_rules() {
        let store = InMemoryStore::with_demo_data();
        let request = NewLeaveRequest {
            employee_id: 3,
            start_date: day("2026-11-02"),
            end_date: day("2026-11-04"),
            leave_type: "vacation".to_string(),
            reason: None,
        };
        let stored = store.submit(request.clone()).await.unwrap();
        assert_eq!(stored.status, LeaveStatus::Pending);
        assert_eq!(stored.days(), 3);

        let err = store.submit(request.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        let backwards = NewLeaveRequest {
            start_date: day("2026-12-10"),
            end_date: day("2026-12-01"),
            ..request
        };
        assert!(store.submit(backwards).await.is_err());
        assert_eq!(store.for_employee(3, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_payroll_recent_order_and_duplicates() {
        let store = InMemoryStore::with_demo_data();
        for (month, year) in [(11, 2025), (1, 2026), (12, 2025)] {
            store
                .insert(NewPayrollEntry {
                    employee_id: 2,
                    month,
                    year,
                    basic_salary: 5000.0,
                    allowances: 100.0,
                    deductions: 500.0,
                })
                .await
                .unwrap();
        }
        let recent = PayrollLedger::recent(&store, 2, 2).await.unwrap();
        assert_eq!(
            recent.iter().map(|p| (p.month, p.year)).collect::<Vec<_>>(),
            vec![(1, 2026), (12, 2025)]
        );
        assert_eq!(recent[0].net_salary, 4600.0);

        let err = store
            .insert(NewPayrollEntry {
                employee_id: 2,
                month: 1,
                year: 2026,
                basic_salary: 1.0,
                allowances: 0.0,
                deductions: 0.0,
            })
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::rejected("Payroll for 01/2026 already exists"));
    }
}
