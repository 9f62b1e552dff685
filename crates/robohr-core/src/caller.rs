//! Identity of the employee a command runs on behalf of.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role supplied by the caller's authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Employee,
}

impl Role {
    /// Admins and managers may act on records of other employees.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "employee" => Ok(Role::Employee),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The authenticated identity and role under which a command executes.
///
/// Owned by the session layer; the pipeline only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Employee id of the caller, if the session is bound to an employee.
    pub employee_id: Option<i64>,
    /// Role of the caller.
    pub role: Role,
    /// Language code the caller interacts in.
    pub language: String,
}

impl CallerContext {
    pub fn new(employee_id: Option<i64>, role: Role, language: impl Into<String>) -> Self {
        Self {
            employee_id,
            role,
            language: language.into(),
        }
    }

    /// Whether the caller may act on the records of `target`.
    pub fn may_act_on(&self, target: i64) -> bool {
        self.role.is_privileged() || self.employee_id == Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" manager ".parse::<Role>().unwrap(), Role::Manager);
        assert!("intern".parse::<Role>().is_err());
    }

    #[test]
    fn test_may_act_on() {
        let employee = CallerContext::new(Some(7), Role::Employee, "en");
        assert!(employee.may_act_on(7));
        assert!(!employee.may_act_on(8));

        let manager = CallerContext::new(Some(1), Role::Manager, "en");
        assert!(manager.may_act_on(8));

        let anonymous = CallerContext::new(None, Role::Employee, "en");
        assert!(!anonymous.may_act_on(7));
    }
}
