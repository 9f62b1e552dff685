//! Action registry.
//!
//! Maps canonical action names to their descriptors. The registry is built
//! once at startup through [`RegistryBuilder`] and is immutable afterwards,
//! so concurrent lookups need no locking.

use crate::error::{HandlerError, RegistryError};
use crate::parameters::{ParamKind, ParamSpec, Parameters};
use async_trait::async_trait;
use robohr_core::CallerContext;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a handler hands back on success.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
    pub data: Option<Value>,
    pub message: String,
}

impl HandlerOutcome {
    pub fn new(data: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

/// The executable bound to an action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn invoke(
        &self,
        params: &Parameters,
        caller: &CallerContext,
    ) -> Result<HandlerOutcome, HandlerError>;
}

/// Who may run an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Every authenticated role.
    Any,
    /// The target `employee_id` must be the caller, unless the caller is admin or manager.
    SelfOrPrivileged,
    /// Admins and managers only.
    Privileged,
}

/// Domain stores an action may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Employees,
    Attendance,
    Leave,
    Payroll,
}

/// Everything the dispatcher needs to validate and run one action.
#[derive(Clone)]
pub struct ActionDescriptor {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// Each group is satisfied by any one of its members.
    pub requirement_groups: Vec<Vec<String>>,
    /// An omitted `employee_id` defaults to the caller's own id.
    pub defaults_to_caller: bool,
    /// `(target, source)`: an absent `target` takes the value of `source`.
    pub fallbacks: Vec<(String, String)>,
    pub access: Access,
    pub stores: Vec<StoreKind>,
    pub handler: Arc<dyn ActionHandler>,
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("requirement_groups", &self.requirement_groups)
            .field("defaults_to_caller", &self.defaults_to_caller)
            .field("access", &self.access)
            .field("stores", &self.stores)
            .finish_non_exhaustive()
    }
}

impl ActionDescriptor {
    pub fn new(name: impl Into<String>, handler: Arc<dyn ActionHandler>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
            requirement_groups: Vec::new(),
            defaults_to_caller: false,
            fallbacks: Vec::new(),
            access: Access::Any,
            stores: Vec::new(),
            handler,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Require at least one of `names` (each must also be declared as a parameter).
    pub fn one_of<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirement_groups
            .push(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn defaults_to_caller(mut self) -> Self {
        self.defaults_to_caller = true;
        self
    }

    pub fn fallback(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.fallbacks.push((target.into(), source.into()));
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn touches(mut self, store: StoreKind) -> Self {
        if !self.stores.contains(&store) {
            self.stores.push(store);
        }
        self
    }

    pub fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Required parameters for display: single names, and `a|b` for groups.
    pub fn required_parameters(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.clone())
            .chain(self.requirement_groups.iter().map(|g| g.join("|")))
            .collect()
    }

    pub fn optional_parameters(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|p| !p.required && !self.requirement_groups.iter().any(|g| g.contains(&p.name)))
            .map(|p| p.name.clone())
            .collect()
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidDescriptor {
            action: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("action name is empty".to_string()));
        }
        for (i, p) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|q| q.name == p.name) {
                return Err(invalid(format!("parameter '{}' declared twice", p.name)));
            }
        }
        for group in &self.requirement_groups {
            if group.is_empty() {
                return Err(invalid("empty requirement group".to_string()));
            }
            if let Some(name) = group.iter().find(|n| self.spec(n).is_none()) {
                return Err(invalid(format!("requirement group names undeclared parameter '{}'", name)));
            }
        }
        for (target, source) in &self.fallbacks {
            match (self.spec(target), self.spec(source)) {
                (Some(t), Some(s)) if t.kind == s.kind => {}
                _ => {
                    return Err(invalid(format!(
                        "fallback {} <- {} needs two declared parameters of the same kind",
                        target, source
                    )));
                }
            }
        }
        let has_employee_id = self
            .spec("employee_id")
            .is_some_and(|p| p.kind == ParamKind::EmployeeId);
        if (self.defaults_to_caller || self.access == Access::SelfOrPrivileged) && !has_employee_id {
            return Err(invalid(
                "self-referential actions must declare an employee_id parameter".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read-only registry of actions.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<ActionDescriptor>>,
}

impl ActionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.get(name).map(|d| d.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Action names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Descriptors sorted by name.
    pub fn descriptors(&self) -> Vec<&ActionDescriptor> {
        let mut list: Vec<&ActionDescriptor> = self.actions.values().map(|d| d.as_ref()).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Collects descriptors at startup.
#[derive(Default)]
pub struct RegistryBuilder {
    actions: HashMap<String, Arc<ActionDescriptor>>,
}

impl RegistryBuilder {
    pub fn register(mut self, descriptor: ActionDescriptor) -> Result<Self, RegistryError> {
        descriptor.validate()?;
        if self.actions.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateAction(descriptor.name));
        }
        tracing::debug!(action = %descriptor.name, access = ?descriptor.access, "Registered action");
        self.actions
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(self)
    }

    pub fn build(self) -> ActionRegistry {
        ActionRegistry {
            actions: self.actions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl ActionHandler for Noop {
        async fn invoke(
            &self,
            _params: &Parameters,
            _caller: &CallerContext,
        ) -> Result<HandlerOutcome, HandlerError> {
            Ok(HandlerOutcome::new(None, "ok"))
        }
    }

    fn descriptor(name: &str) -> ActionDescriptor {
        ActionDescriptor::new(name, Arc::new(Noop))
            .param(ParamSpec::required("employee_id", ParamKind::EmployeeId))
            .defaults_to_caller()
            .access(Access::SelfOrPrivileged)
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ActionRegistry::builder()
            .register(descriptor("clock_in"))
            .unwrap()
            .register(descriptor("clock_out"))
            .unwrap()
            .build();

        assert!(registry.lookup("clock_in").is_some());
        assert!(registry.lookup("dance").is_none());
        assert_eq!(registry.names(), vec!["clock_in", "clock_out"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = ActionRegistry::builder()
            .register(descriptor("clock_in"))
            .unwrap()
            .register(descriptor("clock_in"))
            .err()
            .unwrap();
        assert_eq!(err, RegistryError::DuplicateAction("clock_in".to_string()));
    }

    #[test]
    fn test_group_must_name_declared_params() {
        let bad = ActionDescriptor::new("get_employee_info", Arc::new(Noop))
            .param(ParamSpec::optional("employee_id", ParamKind::EmployeeId))
            .one_of(["employee_id", "employee_name"]);
        assert!(matches!(
            ActionRegistry::builder().register(bad),
            Err(RegistryError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_self_referential_needs_employee_id() {
        let bad = ActionDescriptor::new("view_leave", Arc::new(Noop)).access(Access::SelfOrPrivileged);
        assert!(ActionRegistry::builder().register(bad).is_err());
    }

    #[test]
    fn test_required_parameters_display() {
        let d = ActionDescriptor::new("get_employee_info", Arc::new(Noop))
            .param(ParamSpec::optional("employee_id", ParamKind::EmployeeId))
            .param(ParamSpec::optional("employee_name", ParamKind::Text))
            .param(ParamSpec::optional("department", ParamKind::Text))
            .one_of(["employee_id", "employee_name"]);
        assert_eq!(d.required_parameters(), vec!["employee_id|employee_name"]);
        assert_eq!(d.optional_parameters(), vec!["department"]);
    }
}
