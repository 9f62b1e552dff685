//! Built-in HR actions.
//!
//! Each handler is a small struct holding the stores it declares. Store
//! refusals come back as [`HandlerError::Rejected`] with the store's reason.

use crate::clock::Clock;
use crate::error::{HandlerError, RegistryError};
use crate::parameters::{ParamKind, ParamSpec, Parameters};
use crate::registry::{
    Access, ActionDescriptor, ActionHandler, ActionRegistry, HandlerOutcome, StoreKind,
};
use async_trait::async_trait;
use chrono::Datelike;
use robohr_core::{ActionsConfig, CallerContext};
use robohr_store::{
    AttendanceLedger, Employee, EmployeeDirectory, LeaveRequests, NewLeaveRequest,
    NewPayrollEntry, PayrollLedger, Stores,
};
use serde_json::Value;
use std::sync::Arc;

/// Share of the monthly basic salary withheld as deductions.
const DEDUCTION_RATE: f64 = 0.10;
const DEFAULT_LEAVE_TYPE: &str = "annual";

impl ActionRegistry {
    /// The registry of every built-in action.
    pub fn builtin(
        stores: &Stores,
        limits: &ActionsConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<ActionRegistry, RegistryError> {
        let registry = ActionRegistry::builder()
            .register(
                ActionDescriptor::new(
                    "view_attendance",
                    Arc::new(ViewAttendance {
                        attendance: stores.attendance.clone(),
                        limit: limits.attendance_record_limit,
                    }),
                )
                .description("Show recent attendance records")
                .param(ParamSpec::required("employee_id", ParamKind::EmployeeId))
                .param(ParamSpec::optional("date", ParamKind::Date))
                .defaults_to_caller()
                .access(Access::SelfOrPrivileged)
                .touches(StoreKind::Attendance),
            )?
            .register(
                ActionDescriptor::new(
                    "clock_in",
                    Arc::new(ClockIn {
                        attendance: stores.attendance.clone(),
                        clock: clock.clone(),
                    }),
                )
                .description("Start today's attendance record")
                .param(ParamSpec::required("employee_id", ParamKind::EmployeeId))
                .defaults_to_caller()
                .access(Access::SelfOrPrivileged)
                .touches(StoreKind::Attendance),
            )?
            .register(
                ActionDescriptor::new(
                    "clock_out",
                    Arc::new(ClockOut {
                        attendance: stores.attendance.clone(),
                        clock: clock.clone(),
                    }),
                )
                .description("Close today's attendance record")
                .param(ParamSpec::required("employee_id", ParamKind::EmployeeId))
                .defaults_to_caller()
                .access(Access::SelfOrPrivileged)
                .touches(StoreKind::Attendance),
            )?
            .register(
                ActionDescriptor::new(
                    "request_leave",
                    Arc::new(RequestLeave {
                        leave: stores.leave.clone(),
                    }),
                )
                .description("Submit a leave request")
                .param(ParamSpec::required("employee_id", ParamKind::EmployeeId))
                .param(ParamSpec::required("start_date", ParamKind::Date))
                .param(ParamSpec::required("end_date", ParamKind::Date))
                .param(ParamSpec::optional("reason", ParamKind::Text))
                .param(ParamSpec::optional("leave_type", ParamKind::Text))
                .fallback("end_date", "start_date")
                .defaults_to_caller()
                .access(Access::SelfOrPrivileged)
                .touches(StoreKind::Leave),
            )?
            .register(
                ActionDescriptor::new(
                    "view_leave",
                    Arc::new(ViewLeave {
                        leave: stores.leave.clone(),
                        limit: limits.leave_record_limit,
                    }),
                )
                .description("Show recent leave requests")
                .param(ParamSpec::required("employee_id", ParamKind::EmployeeId))
                .defaults_to_caller()
                .access(Access::SelfOrPrivileged)
                .touches(StoreKind::Leave),
            )?
            .register(
                ActionDescriptor::new(
                    "view_payroll",
                    Arc::new(ViewPayroll {
                        payroll: stores.payroll.clone(),
                        limit: limits.payroll_record_limit,
                    }),
                )
                .description("Show the most recent payroll entries")
                .param(ParamSpec::required("employee_id", ParamKind::EmployeeId))
                .defaults_to_caller()
                .access(Access::SelfOrPrivileged)
                .touches(StoreKind::Payroll),
            )?
            .register(
                ActionDescriptor::new(
                    "view_employees",
                    Arc::new(ViewEmployees {
                        employees: stores.employees.clone(),
                    }),
                )
                .description("List employees, optionally by department")
                .param(ParamSpec::optional("department", ParamKind::Text))
                .access(Access::Any)
                .touches(StoreKind::Employees),
            )?
            .register(
                ActionDescriptor::new(
                    "get_employee_info",
                    Arc::new(GetEmployeeInfo {
                        employees: stores.employees.clone(),
                    }),
                )
                .description("Look up one employee by id or name")
                .param(ParamSpec::optional("employee_id", ParamKind::EmployeeId))
                .param(ParamSpec::optional("employee_name", ParamKind::Text))
                .one_of(["employee_id", "employee_name"])
                .access(Access::Any)
                .touches(StoreKind::Employees),
            )?
            .register(
                ActionDescriptor::new(
                    "generate_payroll",
                    Arc::new(GeneratePayroll {
                        employees: stores.employees.clone(),
                        payroll: stores.payroll.clone(),
                        clock,
                    }),
                )
                .description("Generate a monthly payroll entry from the annual salary")
                .param(ParamSpec::required("employee_id", ParamKind::EmployeeId))
                .param(ParamSpec::optional("month", ParamKind::Month))
                .param(ParamSpec::optional("year", ParamKind::Integer))
                .access(Access::Privileged)
                .touches(StoreKind::Employees)
                .touches(StoreKind::Payroll),
            )?
            .build();
        Ok(registry)
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn target(params: &Parameters) -> Result<i64, HandlerError> {
    // The dispatcher guarantees the id for self-referential actions.
    params
        .employee_id()
        .ok_or_else(|| HandlerError::Backend("employee_id missing after validation".to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, HandlerError> {
    serde_json::to_value(value).map_err(|e| HandlerError::Backend(e.to_string()))
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

/// Employee record as shown to `caller`: salary only for the employee
/// themselves or privileged roles.
fn employee_view(employee: &Employee, caller: &CallerContext) -> Result<Value, HandlerError> {
    let mut value = to_json(employee)?;
    if !caller.may_act_on(employee.id) {
        if let Some(obj) = value.as_object_mut() {
            obj.remove("salary");
        }
    }
    Ok(value)
}

struct ViewAttendance {
    attendance: Arc<dyn AttendanceLedger>,
    limit: usize,
}

#[async_trait]
impl ActionHandler for ViewAttendance {
    async fn invoke(&self, params: &Parameters, _caller: &CallerContext) -> Result<HandlerOutcome, HandlerError> {
        let employee_id = target(params)?;
        let records = match params.date("date") {
            Some(date) => self.attendance.on_date(employee_id, date).await?,
            None => self.attendance.recent(employee_id, self.limit).await?,
        };
        let message = format!("Found {}", plural(records.len(), "attendance record", "attendance records"));
        Ok(HandlerOutcome::new(Some(to_json(&records)?), message))
    }
}

struct ClockIn {
    attendance: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl ActionHandler for ClockIn {
    async fn invoke(&self, params: &Parameters, _caller: &CallerContext) -> Result<HandlerOutcome, HandlerError> {
        let employee_id = target(params)?;
        let record = self.attendance.clock_in(employee_id, self.clock.now()).await?;
        let message = format!("Successfully clocked in at {}", record.clock_in.format("%H:%M"));
        Ok(HandlerOutcome::new(Some(to_json(&record)?), message))
    }
}

struct ClockOut {
    attendance: Arc<dyn AttendanceLedger>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl ActionHandler for ClockOut {
    async fn invoke(&self, params: &Parameters, _caller: &CallerContext) -> Result<HandlerOutcome, HandlerError> {
        let employee_id = target(params)?;
        let record = self.attendance.clock_out(employee_id, self.clock.now()).await?;
        let at = record
            .clock_out
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_default();
        let message = match record.hours_worked {
            Some(hours) => format!("Successfully clocked out at {} ({:.2} hours worked)", at, hours),
            None => format!("Successfully clocked out at {}", at),
        };
        Ok(HandlerOutcome::new(Some(to_json(&record)?), message))
    }
}

struct RequestLeave {
    leave: Arc<dyn LeaveRequests>,
}

#[async_trait]
impl ActionHandler for RequestLeave {
    async fn invoke(&self, params: &Parameters, _caller: &CallerContext) -> Result<HandlerOutcome, HandlerError> {
        let employee_id = target(params)?;
        let (Some(start_date), Some(end_date)) = (params.date("start_date"), params.date("end_date")) else {
            return Err(HandlerError::Rejected("Leave start and end dates are required".to_string()));
        };

        let request = NewLeaveRequest {
            employee_id,
            start_date,
            end_date,
            leave_type: params
                .text("leave_type")
                .unwrap_or(DEFAULT_LEAVE_TYPE)
                .to_lowercase(),
            reason: params.text("reason").map(str::to_string),
        };
        let stored = self.leave.submit(request).await?;
        let message = format!(
            "Leave request submitted for {} to {} ({})",
            stored.start_date, stored.end_date, stored.status
        );
        Ok(HandlerOutcome::new(Some(to_json(&stored)?), message))
    }
}

struct ViewLeave {
    leave: Arc<dyn LeaveRequests>,
    limit: usize,
}

#[async_trait]
impl ActionHandler for ViewLeave {
    async fn invoke(&self, params: &Parameters, _caller: &CallerContext) -> Result<HandlerOutcome, HandlerError> {
        let employee_id = target(params)?;
        let requests = self.leave.for_employee(employee_id, self.limit).await?;
        let message = format!("Found {}", plural(requests.len(), "leave request", "leave requests"));
        Ok(HandlerOutcome::new(Some(to_json(&requests)?), message))
    }
}

struct ViewPayroll {
    payroll: Arc<dyn PayrollLedger>,
    limit: usize,
}

#[async_trait]
impl ActionHandler for ViewPayroll {
    async fn invoke(&self, params: &Parameters, _caller: &CallerContext) -> Result<HandlerOutcome, HandlerError> {
        let employee_id = target(params)?;
        let entries = self.payroll.recent(employee_id, self.limit).await?;
        let message = format!("Found {}", plural(entries.len(), "payroll entry", "payroll entries"));
        Ok(HandlerOutcome::new(Some(to_json(&entries)?), message))
    }
}

struct ViewEmployees {
    employees: Arc<dyn EmployeeDirectory>,
}

#[async_trait]
impl ActionHandler for ViewEmployees {
    async fn invoke(&self, params: &Parameters, caller: &CallerContext) -> Result<HandlerOutcome, HandlerError> {
        let department = params.text("department");
        let employees = self.employees.list(department).await?;
        let data = employees
            .iter()
            .map(|e| employee_view(e, caller))
            .collect::<Result<Vec<_>, _>>()?;
        let found = plural(employees.len(), "employee", "employees");
        let message = match department {
            Some(department) => format!("Found {} in {}", found, department),
            None => format!("Found {}", found),
        };
        Ok(HandlerOutcome::new(Some(Value::Array(data)), message))
    }
}

struct GetEmployeeInfo {
    employees: Arc<dyn EmployeeDirectory>,
}

#[async_trait]
impl ActionHandler for GetEmployeeInfo {
    async fn invoke(&self, params: &Parameters, caller: &CallerContext) -> Result<HandlerOutcome, HandlerError> {
        let employee = if let Some(id) = params.employee_id() {
            self.employees
                .get(id)
                .await?
                .ok_or_else(|| HandlerError::NotFound(format!("No employee found with id {}", id)))?
        } else if let Some(name) = params.text("employee_name") {
            // First match wins; ambiguity is accepted.
            let matches = self.employees.find_by_name(name).await?;
            if matches.len() > 1 {
                tracing::debug!(name, count = matches.len(), "Ambiguous employee name, using first match");
            }
            matches
                .into_iter()
                .next()
                .ok_or_else(|| HandlerError::NotFound(format!("No employee found matching '{}'", name)))?
        } else {
            return Err(HandlerError::Backend("employee reference missing after validation".to_string()));
        };

        let message = match employee.department.as_deref() {
            Some(department) => format!("{} works in {}", employee.full_name(), department),
            None => employee.full_name(),
        };
        Ok(HandlerOutcome::new(Some(employee_view(&employee, caller)?), message))
    }
}

struct GeneratePayroll {
    employees: Arc<dyn EmployeeDirectory>,
    payroll: Arc<dyn PayrollLedger>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl ActionHandler for GeneratePayroll {
    async fn invoke(&self, params: &Parameters, _caller: &CallerContext) -> Result<HandlerOutcome, HandlerError> {
        let employee_id = target(params)?;
        let employee = self
            .employees
            .get(employee_id)
            .await?
            .ok_or_else(|| HandlerError::NotFound(format!("No employee found with id {}", employee_id)))?;

        let today = self.clock.today();
        let month = params.integer("month").map(|m| m as u32).unwrap_or(today.month());
        let year = params.integer("year").map(|y| y as i32).unwrap_or(today.year());

        let basic_salary = round2(employee.salary / 12.0);
        let entry = NewPayrollEntry {
            employee_id,
            month,
            year,
            basic_salary,
            allowances: 0.0,
            deductions: round2(basic_salary * DEDUCTION_RATE),
        };
        let stored = self.payroll.insert(entry).await?;
        let message = format!(
            "Payroll for {} generated for {:02}/{}: net {:.2}",
            employee.full_name(),
            stored.month,
            stored.year,
            stored.net_salary
        );
        Ok(HandlerOutcome::new(Some(to_json(&stored)?), message))
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::parameters::ParamValue::{self, Integer, Text};
    use chrono::{NaiveDate, NaiveDateTime};
    use robohr_core::Role;
    use robohr_store::InMemoryStore;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            NaiveDateTime::parse_from_str("2026-10-19 09:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
        ))
    }

    fn registry() -> ActionRegistry {
        let stores = Stores::shared(Arc::new(InMemoryStore::with_demo_data()));
        ActionRegistry::builtin(&stores, &ActionsConfig::default(), clock()).unwrap()
    }

    fn params(pairs: &[(&str, ParamValue)]) -> Parameters {
        let mut p = Parameters::new();
        for (k, v) in pairs {
            p.insert(*k, v.clone());
        }
        p
    }

    #[test]
    fn test_builtin_actions() {
        let registry = registry();
        assert_eq!(
            registry.names(),
            vec![
                "clock_in",
                "clock_out",
                "generate_payroll",
                "get_employee_info",
                "request_leave",
                "view_attendance",
                "view_employees",
                "view_leave",
                "view_payroll",
            ]
        );
        let payroll = registry.lookup("view_payroll").unwrap();
        assert_eq!(payroll.required_parameters(), vec!["employee_id"]);
        assert_eq!(payroll.stores, vec![StoreKind::Payroll]);
        assert_eq!(
            registry.lookup("generate_payroll").unwrap().access,
            Access::Privileged
        );
    }

    #[tokio::test]
    async fn test_get_employee_info_first_match_wins() {
        let registry = registry();
        let handler = &registry.lookup("get_employee_info").unwrap().handler;
        let caller = CallerContext::new(Some(2), Role::Employee, "en");

        let outcome = handler
            .invoke(&params(&[("employee_name", Text("John".into()))]), &caller)
            .await
            .unwrap();
        let data = outcome.data.unwrap();
        // "Alice Johnson" has the lowest id among the matches
        assert_eq!(data["id"], 1);
        assert!(data.get("salary").is_none());

        let err = handler
            .invoke(&params(&[("employee_name", Text("Zed".into()))]), &caller)
            .await
            .unwrap_err();
        assert_eq!(err, HandlerError::NotFound("No employee found matching 'Zed'".to_string()));
    }

    #[tokio::test]
    async fn test_own_record_keeps_salary() {
        let registry = registry();
        let handler = &registry.lookup("get_employee_info").unwrap().handler;
        let caller = CallerContext::new(Some(2), Role::Employee, "en");
        let outcome = handler
            .invoke(&params(&[("employee_id", Integer(2))]), &caller)
            .await
            .unwrap();
        assert_eq!(outcome.data.unwrap()["salary"], 65000.0);
    }

    #[tokio::test]
    async fn test_generate_payroll_arithmetic() {
        let registry = registry();
        let handler = &registry.lookup("generate_payroll").unwrap().handler;
        let caller = CallerContext::new(Some(1), Role::Admin, "en");

        let outcome = handler
            .invoke(&params(&[("employee_id", Integer(2))]), &caller)
            .await
            .unwrap();
        let data = outcome.data.unwrap();
        // 65000 / 12 = 5416.67; 10% deductions = 541.67
        assert_eq!(data["basic_salary"], 5416.67);
        assert_eq!(data["deductions"], 541.67);
        assert_eq!(data["net_salary"], 4875.0);
        assert_eq!(data["month"], 10);
        assert_eq!(data["year"], 2026);

        let err = handler
            .invoke(&params(&[("employee_id", Integer(2))]), &caller)
            .await
            .unwrap_err();
        assert_eq!(err, HandlerError::Rejected("Payroll for 10/2026 already exists".to_string()));
    }

    #[tokio::test]
    async fn test_view_employees_by_department() {
        let registry = registry();
        let handler = &registry.lookup("view_employees").unwrap().handler;
        let caller = CallerContext::new(Some(1), Role::Manager, "en");
        let outcome = handler
            .invoke(&params(&[("department", Text("Engineering".into()))]), &caller)
            .await
            .unwrap();
        assert_eq!(outcome.message, "Found 3 employees in Engineering");
    }

    #[tokio::test]
    async fn test_view_attendance_for_a_date_beyond_the_recent_window() {
        let store = Arc::new(InMemoryStore::with_demo_data());
        let first_day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        for offset in 0..40 {
            let day = first_day + chrono::Duration::days(offset);
            let start = day.and_hms_opt(9, 0, 0).unwrap();
            store.clock_in(2, start).await.unwrap();
            store.clock_out(2, start + chrono::Duration::hours(8)).await.unwrap();
        }
        let stores = Stores::shared(store);
        let registry = ActionRegistry::builtin(&stores, &ActionsConfig::default(), clock()).unwrap();
        let handler = &registry.lookup("view_attendance").unwrap().handler;
        let caller = CallerContext::new(Some(2), Role::Employee, "en");

        let recent = handler
            .invoke(&params(&[("employee_id", Integer(2))]), &caller)
            .await
            .unwrap();
        assert_eq!(recent.message, "Found 30 attendance records");

        let dated = handler
            .invoke(
                &params(&[("employee_id", Integer(2)), ("date", ParamValue::Date(first_day))]),
                &caller,
            )
            .await
            .unwrap();
        assert_eq!(dated.message, "Found 1 attendance record");
        assert_eq!(dated.data.unwrap()[0]["date"], "2026-01-05");
    }
}
