//! Command dispatcher.
//!
//! Validates an [`Intent`] against the action registry and runs the matching
//! handler. Every recoverable outcome becomes a [`CommandResult`]; only
//! backend faults escape as [`DispatchError`].
//!
//! ```text
//! Recognized ──lookup──▶ unknown action ─────────────────▶ Completed (UnknownAction)
//!     │
//!     ├─ coerce params, apply caller default and fallbacks
//!     ├─ required params ─────────────── missing ────────▶ Completed (MissingParameter)
//!     ├─ access rule ─────────────────── denied ─────────▶ Completed (Forbidden)
//!     ▼
//! Authorized ─ low confidence + clarify ─────────────────▶ Completed (RecognitionLowConfidence)
//!     │
//!     ▼ handler
//! Executed ──▶ Completed (success) | ExecutionFailed (NotFound / DomainRejected)
//! ```

use crate::clock::{Clock, SystemClock};
use crate::error::{DispatchError, HandlerError};
use crate::parameters::{ParamKind, ParamValue, Parameters};
use crate::registry::{Access, ActionDescriptor, ActionRegistry};
use robohr_core::{
    CallerContext, CommandResult, DispatchStage, ErrorKind, Intent, LowConfidencePolicy,
};
use serde_json::{Map, Value};
use std::sync::Arc;

pub struct Dispatcher {
    registry: Arc<ActionRegistry>,
    confidence_threshold: f64,
    low_confidence: LowConfidencePolicy,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        Self {
            registry,
            confidence_threshold: 0.5,
            low_confidence: LowConfidencePolicy::Execute,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_low_confidence_policy(mut self, policy: LowConfidencePolicy) -> Self {
        self.low_confidence = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub async fn dispatch(
        &self,
        intent: &Intent,
        caller: &CallerContext,
    ) -> Result<CommandResult, DispatchError> {
        let action = intent.action.as_str();
        tracing::debug!(
            action,
            confidence = intent.confidence,
            stage = %DispatchStage::Recognized,
            "Dispatching intent"
        );

        // Recognized -> Authorized
        let Some(descriptor) = self.registry.lookup(action) else {
            tracing::info!(action, "Recognized action has no handler");
            return Ok(CommandResult::failure(
                action,
                ErrorKind::UnknownAction,
                format!("Action '{}' was recognized but not implemented", action),
            )
            .with_parameters(intent.parameters.clone()));
        };

        let params = match self.resolve_parameters(descriptor, intent, caller) {
            Ok(params) => params,
            Err(message) => {
                tracing::debug!(action, %message, "Parameter validation failed");
                return Ok(CommandResult::failure(action, ErrorKind::MissingParameter, message)
                    .with_parameters(intent.parameters.clone()));
            }
        };
        let low_confidence = intent.is_low_confidence(self.confidence_threshold);
        let finish = |result: CommandResult| {
            let result = result.with_parameters(params.to_json());
            if low_confidence {
                result.with_flag(ErrorKind::RecognitionLowConfidence)
            } else {
                result
            }
        };

        if let Err(message) = authorize(descriptor, &params, caller) {
            tracing::info!(action, role = %caller.role, "Caller not authorized");
            return Ok(finish(CommandResult::failure(action, ErrorKind::Forbidden, message)));
        }
        tracing::debug!(action, stage = %DispatchStage::Authorized, "Authorized");

        if low_confidence && self.low_confidence == LowConfidencePolicy::Clarify {
            let mut result = CommandResult::failure(
                action,
                ErrorKind::RecognitionLowConfidence,
                format!(
                    "Recognition confidence {:.2} is below {:.2}",
                    intent.confidence, self.confidence_threshold
                ),
            )
            .with_stage(DispatchStage::Authorized);
            let alternatives = intent.alternatives.iter().cloned().map(Value::String).collect();
            let mut data = Map::new();
            data.insert("alternatives".to_string(), Value::Array(alternatives));
            result.data = Some(Value::Object(data));
            return Ok(finish(result));
        }

        // Authorized -> Executed
        let outcome = descriptor.handler.invoke(&params, caller).await;
        tracing::debug!(action, stage = %DispatchStage::Executed, ok = outcome.is_ok(), "Handler returned");

        // Executed -> Completed
        match outcome {
            Ok(outcome) => Ok(finish(CommandResult::success(action, outcome.data, outcome.message))),
            Err(HandlerError::Rejected(reason)) => {
                Ok(finish(CommandResult::failure(action, ErrorKind::DomainRejected, reason)))
            }
            Err(HandlerError::NotFound(reason)) => {
                Ok(finish(CommandResult::failure(action, ErrorKind::NotFound, reason)))
            }
            Err(HandlerError::Backend(reason)) => {
                tracing::warn!(action, %reason, "Handler backend failure");
                Err(DispatchError::Backend {
                    action: action.to_string(),
                    reason,
                })
            }
        }
    }

    fn resolve_parameters(
        &self,
        descriptor: &ActionDescriptor,
        intent: &Intent,
        caller: &CallerContext,
    ) -> Result<Parameters, String> {
        let mut params = Parameters::coerce(&descriptor.params, &intent.parameters, self.clock.today())
            .map_err(|e| e.to_string())?;

        if descriptor.defaults_to_caller && !params.contains("employee_id") {
            if let Some(id) = caller.employee_id {
                params.insert("employee_id", ParamValue::Integer(id));
            }
        }
        for (target, source) in &descriptor.fallbacks {
            if !params.contains(target) {
                if let Some(value) = params.get(source).cloned() {
                    params.insert(target.clone(), value);
                }
            }
        }

        for spec in descriptor.params.iter().filter(|p| p.required) {
            if !params.contains(&spec.name) {
                let hint = if spec.kind == ParamKind::EmployeeId && caller.employee_id.is_none() {
                    " (no employee is associated with this session)"
                } else {
                    ""
                };
                return Err(format!("Missing required parameter '{}'{}", spec.name, hint));
            }
        }
        for group in &descriptor.requirement_groups {
            if !group.iter().any(|name| params.contains(name)) {
                return Err(format!("Missing required parameter: one of {}", group.join(", ")));
            }
        }
        Ok(params)
    }
}

fn authorize(
    descriptor: &ActionDescriptor,
    params: &Parameters,
    caller: &CallerContext,
) -> Result<(), String> {
    match descriptor.access {
        Access::Any => Ok(()),
        Access::Privileged if caller.role.is_privileged() => Ok(()),
        Access::Privileged => Err(format!(
            "Role '{}' may not run '{}'",
            caller.role, descriptor.name
        )),
        Access::SelfOrPrivileged => match params.employee_id() {
            Some(target) if caller.may_act_on(target) => Ok(()),
            Some(target) => Err(format!(
                "Role '{}' may not run '{}' for employee {}",
                caller.role, descriptor.name, target
            )),
            None => Err(format!("No target employee for '{}'", descriptor.name)),
        },
    }
}
