//! Per-action limits used by the built-in handlers and the composer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Most recent payroll entries returned by `view_payroll`.
    #[serde(default = "default_payroll_record_limit")]
    pub payroll_record_limit: usize,

    /// Most recent attendance records returned by `view_attendance`.
    #[serde(default = "default_attendance_record_limit")]
    pub attendance_record_limit: usize,

    /// Most recent leave requests returned by `view_leave`.
    #[serde(default = "default_leave_record_limit")]
    pub leave_record_limit: usize,

    /// Listings longer than this are not read out in full.
    #[serde(default = "default_speakable_record_limit")]
    pub speakable_record_limit: usize,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            payroll_record_limit: default_payroll_record_limit(),
            attendance_record_limit: default_attendance_record_limit(),
            leave_record_limit: default_leave_record_limit(),
            speakable_record_limit: default_speakable_record_limit(),
        }
    }
}

fn default_payroll_record_limit() -> usize {
    6
}

fn default_attendance_record_limit() -> usize {
    30
}

fn default_leave_record_limit() -> usize {
    20
}

fn default_speakable_record_limit() -> usize {
    3
}
