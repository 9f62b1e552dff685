//! PostgreSQL implementation of the RoboHR domain stores.
//!
//! One [`PostgresStore`] implements all four store traits against a shared
//! connection pool. Business-rule refusals (unknown employee, already clocked
//! in, duplicate payroll month) come back as [`StoreError::Rejected`].

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use robohr_store::{
    AttendanceLedger, AttendanceRecord, Employee, EmployeeDirectory, LeaveRequest, LeaveRequests,
    LeaveStatus, NewEmployee, NewLeaveRequest, NewPayrollEntry, PayrollEntry, PayrollLedger, StoreError,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

pub mod schema;

// Postgres SQLSTATE codes surfaced as business refusals.
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(backend)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the RoboHR tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }

    pub async fn insert_employee(&self, employee: &NewEmployee) -> Result<Employee, StoreError> {
        let sql = format!(
            "INSERT INTO employees (first_name, last_name, email, department, position, salary, hire_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            EMPLOYEE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(&employee.email)
            .bind(&employee.department)
            .bind(&employee.position)
            .bind(employee.salary)
            .bind(employee.hire_date)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, || format!("Email {} is already registered", employee.email)))?;
        employee_from_row(&row).map_err(backend)
    }

    /// Insert `employees` when the directory is empty. Returns how many rows were added.
    pub async fn seed_if_empty(&self, employees: &[NewEmployee]) -> Result<usize, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM employees")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        if count > 0 {
            return Ok(0);
        }
        for employee in employees {
            self.insert_employee(employee).await?;
        }
        tracing::info!(count = employees.len(), "seeded employee directory");
        Ok(employees.len())
    }

    async fn require_employee(&self, id: i64) -> Result<(), StoreError> {
        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match exists {
            Some(_) => Ok(()),
            None => Err(StoreError::rejected(format!("Employee {} does not exist", id))),
        }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::warn!(error = %err, "postgres store error");
    StoreError::backend(err.to_string())
}

/// Map constraint violations to refusals, everything else to backend faults.
fn classify(err: sqlx::Error, unique_reason: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some(UNIQUE_VIOLATION) => return StoreError::rejected(unique_reason()),
            Some(FOREIGN_KEY_VIOLATION) => {
                return StoreError::rejected("Employee does not exist");
            }
            _ => {}
        }
    }
    backend(err)
}

const EMPLOYEE_COLUMNS: &str =
    "id, first_name, last_name, email, department, position, salary, hire_date, status";

fn employee_from_row(row: &PgRow) -> Result<Employee, sqlx::Error> {
    Ok(Employee {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        department: row.try_get("department")?,
        position: row.try_get("position")?,
        salary: row.try_get("salary")?,
        hire_date: row.try_get("hire_date")?,
        status: row.try_get("status")?,
    })
}

fn attendance_from_row(row: &PgRow) -> Result<AttendanceRecord, sqlx::Error> {
    Ok(AttendanceRecord {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        date: row.try_get("date")?,
        clock_in: row.try_get("clock_in")?,
        clock_out: row.try_get("clock_out")?,
        hours_worked: row.try_get("hours_worked")?,
    })
}

fn leave_from_row(row: &PgRow) -> Result<LeaveRequest, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(LeaveRequest {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        leave_type: row.try_get("leave_type")?,
        reason: row.try_get("reason")?,
        status: LeaveStatus::parse(&status).unwrap_or(LeaveStatus::Pending),
        created_at: row.try_get("created_at")?,
    })
}

fn payroll_from_row(row: &PgRow) -> Result<PayrollEntry, sqlx::Error> {
    let month: i32 = row.try_get("month")?;
    Ok(PayrollEntry {
        id: row.try_get("id")?,
        employee_id: row.try_get("employee_id")?,
        month: month as u32,
        year: row.try_get("year")?,
        basic_salary: row.try_get("basic_salary")?,
        allowances: row.try_get("allowances")?,
        deductions: row.try_get("deductions")?,
        net_salary: row.try_get("net_salary")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn collect<T>(
    rows: Vec<PgRow>,
    map: impl Fn(&PgRow) -> Result<T, sqlx::Error>,
) -> Result<Vec<T>, StoreError> {
    rows.iter().map(|r| map(r).map_err(backend)).collect()
}

#[async_trait]
impl EmployeeDirectory for PostgresStore {
    async fn get(&self, id: i64) -> Result<Option<Employee>, StoreError> {
        let sql = format!("SELECT {} FROM employees WHERE id = $1", EMPLOYEE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.as_ref()
            .map(employee_from_row)
            .transpose()
            .map_err(backend)
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Employee>, StoreError> {
        let query = name.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM employees \
             WHERE strpos(lower(first_name || ' ' || last_name), lower($1)) > 0 \
             ORDER BY id",
            EMPLOYEE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(query)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        collect(rows, employee_from_row)
    }

    async fn list(&self, department: Option<&str>) -> Result<Vec<Employee>, StoreError> {
        let rows = match department {
            Some(department) => {
                let sql = format!(
                    "SELECT {} FROM employees WHERE lower(department) = lower($1) ORDER BY id",
                    EMPLOYEE_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(department.trim())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!("SELECT {} FROM employees ORDER BY id", EMPLOYEE_COLUMNS);
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
        }
        .map_err(backend)?;
        collect(rows, employee_from_row)
    }
}

#[async_trait]
impl AttendanceLedger for PostgresStore {
    async fn clock_in(&self, employee_id: i64, at: NaiveDateTime) -> Result<AttendanceRecord, StoreError> {
        self.require_employee(employee_id).await?;

        // The partial unique index on open records turns a concurrent second
        // clock-in into a unique violation.
        let row = sqlx::query(
            "INSERT INTO attendance (employee_id, date, clock_in) VALUES ($1, $2, $3) \
             RETURNING id, employee_id, date, clock_in, clock_out, hours_worked",
        )
        .bind(employee_id)
        .bind(at.date())
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, || "Employee is already clocked in".to_string()))?;
        attendance_from_row(&row).map_err(backend)
    }

    async fn clock_out(&self, employee_id: i64, at: NaiveDateTime) -> Result<AttendanceRecord, StoreError> {
        let row = sqlx::query(
            "UPDATE attendance \
             SET clock_out = $3, \
                 hours_worked = round((extract(epoch FROM ($3 - clock_in)) / 3600.0)::numeric, 2)::double precision \
             WHERE id = ( \
                 SELECT id FROM attendance \
                 WHERE employee_id = $1 AND date = $2 AND clock_out IS NULL \
                 ORDER BY id DESC LIMIT 1) \
             RETURNING id, employee_id, date, clock_in, clock_out, hours_worked",
        )
        .bind(employee_id)
        .bind(at.date())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some(row) => attendance_from_row(&row).map_err(backend),
            None => Err(StoreError::rejected("Employee is not clocked in")),
        }
    }

    async fn recent(&self, employee_id: i64, limit: usize) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, employee_id, date, clock_in, clock_out, hours_worked FROM attendance \
             WHERE employee_id = $1 ORDER BY date DESC, id DESC LIMIT $2",
        )
        .bind(employee_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows, attendance_from_row)
    }

    async fn on_date(&self, employee_id: i64, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, employee_id, date, clock_in, clock_out, hours_worked FROM attendance \
             WHERE employee_id = $1 AND date = $2 ORDER BY id DESC",
        )
        .bind(employee_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows, attendance_from_row)
    }
}

#[async_trait]
impl LeaveRequests for PostgresStore {
    async fn submit(&self, request: NewLeaveRequest) -> Result<LeaveRequest, StoreError> {
        if request.end_date < request.start_date {
            return Err(StoreError::rejected(
                "Leave end date cannot be before the start date",
            ));
        }

        let mut tx = self.pool.begin().await.map_err(backend)?;

        // The employee row lock serializes concurrent submissions of one employee.
        let employee: Option<(i64,)> = sqlx::query_as("SELECT id FROM employees WHERE id = $1 FOR UPDATE")
            .bind(request.employee_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(backend)?;
        if employee.is_none() {
            return Err(StoreError::rejected(format!(
                "Employee {} does not exist",
                request.employee_id
            )));
        }

        let overlapping: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM leave_requests \
             WHERE employee_id = $1 AND status <> 'rejected' \
               AND start_date <= $3 AND $2 <= end_date \
             LIMIT 1",
        )
        .bind(request.employee_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;
        if overlapping.is_some() {
            return Err(StoreError::rejected(
                "Leave request overlaps an existing leave request",
            ));
        }

        let row = sqlx::query(
            "INSERT INTO leave_requests (employee_id, start_date, end_date, leave_type, reason, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, 'pending', $6) \
             RETURNING id, employee_id, start_date, end_date, leave_type, reason, status, created_at",
        )
        .bind(request.employee_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.leave_type)
        .bind(&request.reason)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, || "Leave request already exists".to_string()))?;
        let request = leave_from_row(&row).map_err(backend)?;
        tx.commit().await.map_err(backend)?;
        Ok(request)
    }

    async fn for_employee(&self, employee_id: i64, limit: usize) -> Result<Vec<LeaveRequest>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, employee_id, start_date, end_date, leave_type, reason, status, created_at \
             FROM leave_requests WHERE employee_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(employee_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows, leave_from_row)
    }
}

#[async_trait]
impl PayrollLedger for PostgresStore {
    async fn recent(&self, employee_id: i64, limit: usize) -> Result<Vec<PayrollEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, employee_id, month, year, basic_salary, allowances, deductions, \
                    net_salary, status, created_at \
             FROM payroll WHERE employee_id = $1 \
             ORDER BY year DESC, month DESC LIMIT $2",
        )
        .bind(employee_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows, payroll_from_row)
    }

    async fn insert(&self, entry: NewPayrollEntry) -> Result<PayrollEntry, StoreError> {
        self.require_employee(entry.employee_id).await?;
        if !(1..=12).contains(&entry.month) {
            return Err(StoreError::rejected(format!("Invalid payroll month {}", entry.month)));
        }

        let (month, year) = (entry.month, entry.year);
        let row = sqlx::query(
            "INSERT INTO payroll (employee_id, month, year, basic_salary, allowances, deductions, net_salary, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'generated', $8) \
             RETURNING id, employee_id, month, year, basic_salary, allowances, deductions, \
                       net_salary, status, created_at",
        )
        .bind(entry.employee_id)
        .bind(entry.month as i32)
        .bind(entry.year)
        .bind(entry.basic_salary)
        .bind(entry.allowances)
        .bind(entry.deductions)
        .bind(entry.net_salary())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, || format!("Payroll for {:02}/{} already exists", month, year)))?;
        payroll_from_row(&row).map_err(backend)
    }
}
