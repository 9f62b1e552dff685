//! Offline pattern recognizer.
//!
//! Classifies English commands with a fixed table of regular expressions,
//! falling back to keyword counting, and extracts the few entities the
//! built-in actions need (dates, employee ids and names, departments,
//! payroll periods, leave reasons). Confidence reflects how much of the
//! text the matching pattern covers.

use crate::clock::Clock;
use crate::error::RecognitionFailure;
use crate::intent_client::IntentRecognizer;
use crate::parameters::{month_number, parse_date};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use regex::Regex;
use robohr_core::{CallerContext, Intent};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Confidence ceiling for a pattern match.
const PATTERN_CEILING: f64 = 0.9;
/// Confidence floor for a pattern match.
const PATTERN_FLOOR: f64 = 0.3;
/// Confidence ceiling for the keyword fallback.
const KEYWORD_CEILING: f64 = 0.7;
const UNKNOWN_CONFIDENCE: f64 = 0.1;
/// Longest leave span accepted from an "N days" phrase.
const MAX_LEAVE_DAYS: i64 = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Attendance,
    ClockIn,
    ClockOut,
    Leave,
    GeneratePayroll,
    Payroll,
    Employee,
    Report,
}

const INTENT_PATTERNS: &[(Topic, &[&str])] = &[
    (
        Topic::Attendance,
        &[
            r"\b(?:show|view|check|see)\s+(?:my\s+)?attendance\b",
            r"\b(?:attendance|present|absent)\s+(?:for|on|today|yesterday)\b",
            r"\bhow many\s+(?:days|hours)\s+(?:have|did)\s+i\s+work",
            r"\bwhen\s+(?:did|was)\s+i\s+(?:in|out|present)",
        ],
    ),
    (
        Topic::ClockIn,
        &[
            r"\b(?:clock|check)\s+in\b",
            r"\bstart\s+work(?:ing)?\b",
            r"\bi'm\s+(?:here|in|arriving)\b",
            r"\bbegin\s+(?:my\s+)?(?:work|shift)\b",
        ],
    ),
    (
        Topic::ClockOut,
        &[
            r"\b(?:clock|check)\s+out\b",
            r"\b(?:end|finish|stop)\s+work(?:ing)?\b",
            r"\bi'm\s+(?:leaving|done|finished)\b",
            r"\bgoing\s+home\b",
        ],
    ),
    (
        Topic::Leave,
        &[
            r"\b(?:request|apply|take|need)\s+(?:a\s+)?leave\b",
            r"\b(?:vacation|holiday|time\s+off)\b",
            r"\bcan't\s+(?:come|work)\s+(?:today|tomorrow)\b",
            r"\b(?:sick|personal)\s+(?:leave|day)\b",
        ],
    ),
    (
        Topic::GeneratePayroll,
        &[r"\b(?:generate|run|process|create)\s+(?:the\s+)?payroll\b"],
    ),
    (
        Topic::Payroll,
        &[
            r"\b(?:show|view|check)\s+(?:my\s+)?(?:payroll|salary|pay)\b",
            r"\bhow\s+much\s+(?:do|did)\s+i\s+(?:earn|make|get\s+paid)\b",
            r"\b(?:payslip|pay\s+stub|salary\s+slip)\b",
            r"\bwhat's\s+my\s+(?:salary|pay)\b",
        ],
    ),
    (
        Topic::Employee,
        &[
            r"\b(?:show|list|find|search)\s+(?:all\s+)?employees?\b",
            r"\b(?:add|create|new)\s+employee\b",
            r"\bwho\s+(?:works|is)\s+in\b",
            r"\bemployee\s+(?:list|directory|information)\b",
        ],
    ),
    (
        Topic::Report,
        &[
            r"\b(?:generate|create|show|get)\s+(?:a\s+)?report\b",
            r"\b(?:analytics|statistics|summary)\b",
            r"\breport\s+(?:for|on|about)\b",
            r"\bshow\s+(?:me\s+)?(?:stats|data|analytics)\b",
        ],
    ),
];

const KEYWORDS: &[(Topic, &[&str])] = &[
    (Topic::Attendance, &["attendance", "present", "absent", "work", "office"]),
    (Topic::ClockIn, &["clock in", "start work", "arrive", "check in"]),
    (Topic::ClockOut, &["clock out", "leave", "finish", "end work", "check out"]),
    (Topic::Leave, &["leave", "vacation", "holiday", "time off", "absent"]),
    (Topic::Payroll, &["salary", "pay", "payroll", "money", "wages"]),
    (Topic::Employee, &["employee", "staff", "worker", "person", "team"]),
    (Topic::Report, &["report", "summary", "analytics", "data"]),
];

/// Relative date phrases and their offset in days from today.
const RELATIVE_DATES: &[(&str, i64)] = &[
    ("today", 0),
    ("tomorrow", 1),
    ("yesterday", -1),
    ("this week", 0),
    ("next week", 7),
    ("last week", -7),
];

const DEPARTMENTS: &[(&str, &str)] = &[
    ("engineering", "Engineering"),
    ("human resources", "Human Resources"),
    ("hr", "Human Resources"),
    ("sales", "Sales"),
    ("marketing", "Marketing"),
    ("finance", "Finance"),
    ("it", "IT"),
    ("operations", "Operations"),
    ("design", "Design"),
    ("legal", "Legal"),
];

/// Capitalized words that never start a person's name in a command.
const NAME_STOPWORDS: &[&str] = &[
    "show", "find", "search", "list", "get", "view", "display", "look", "lookup", "who", "is",
    "where", "what", "employee", "employees", "staff", "info", "information", "details", "about",
    "for", "me", "my", "the", "all", "named", "called", "please", "in", "of", "i", "i'm",
    "directory", "record", "profile",
];

const ALTERNATIVES: &[&str] = &["view_attendance", "request_leave", "view_payroll", "view_employees"];

struct IntentRule {
    topic: Topic,
    patterns: Vec<(Regex, usize)>,
}

/// English-only intent recognizer that needs no network.
pub struct PatternRecognizer {
    rules: Vec<IntentRule>,
    employee_ref: Regex,
    explicit_date: Regex,
    days: Regex,
    named: Regex,
    word: Regex,
    month: Regex,
    year: Regex,
    reasons: Vec<Regex>,
    date_only: Regex,
    clock: Arc<dyn Clock>,
}

impl PatternRecognizer {
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self, regex::Error> {
        let rules = INTENT_PATTERNS
            .iter()
            .map(|(topic, sources)| {
                let patterns = sources
                    .iter()
                    .map(|src| Ok((Regex::new(src)?, src.replace(r"\b", "").len())))
                    .collect::<Result<Vec<_>, regex::Error>>()?;
                Ok(IntentRule {
                    topic: *topic,
                    patterns,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self {
            rules,
            employee_ref: Regex::new(r"\b(?:employee|emp)\s*(?:id|#)?\s*#?(\d+)\b")?,
            explicit_date: Regex::new(r"\b(\d{4}[-/]\d{1,2}[-/]\d{1,2}|\d{1,2}[-/]\d{1,2}[-/]\d{4})\b")?,
            days: Regex::new(r"\b(\d+)\s+days?\b")?,
            named: Regex::new(r"\b(?:named|called)\s+([A-Za-z]+)(?:\s+([A-Za-z]+))?")?,
            word: Regex::new(r"[A-Za-z']+")?,
            month: Regex::new(
                r"\b(january|february|march|april|may|june|july|august|september|october|november|december)\b",
            )?,
            year: Regex::new(r"\b(20\d{2})\b")?,
            reasons: vec![
                Regex::new(r"\bbecause\s+(.+?)(?:\.|$)")?,
                Regex::new(r"\bdue to\s+(.+?)(?:\.|$)")?,
                Regex::new(r"\bfor\s+(.+?)(?:\.|$)")?,
            ],
            date_only: Regex::new(
                r"^(?:(?:today|tomorrow|yesterday|this|next|last|week|the|and|to|from|on|days?|\d+|[\d/-]+)\s*)+$",
            )?,
            clock,
        })
    }

    fn classify(&self, text: &str) -> Option<(Topic, f64)> {
        for rule in &self.rules {
            for (pattern, length) in &rule.patterns {
                let matches = pattern.find_iter(text).count();
                if matches > 0 {
                    let coverage = (matches * length) as f64 / (text.chars().count() + 1) as f64;
                    return Some((rule.topic, coverage.min(PATTERN_CEILING).max(PATTERN_FLOOR)));
                }
            }
        }

        let mut best: Option<(Topic, usize)> = None;
        for (topic, keywords) in KEYWORDS {
            let score = keywords.iter().filter(|k| text.contains(*k)).count();
            if score > best.map_or(0, |(_, s)| s) {
                best = Some((*topic, score));
            }
        }
        best.map(|(topic, score)| (topic, (score as f64 / 5.0).min(KEYWORD_CEILING)))
    }

    fn dates(&self, text: &str, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let mut explicit = self
            .explicit_date
            .captures_iter(text)
            .filter_map(|c| parse_date(&c[1], today));
        let first = explicit.next();
        let second = explicit.next();

        let start = first.or_else(|| {
            RELATIVE_DATES
                .iter()
                .find(|(phrase, _)| text.contains(phrase))
                .and_then(|(_, offset)| today.checked_add_signed(Duration::try_days(*offset)?))
        });
        // An end date that cannot be represented is left unset; start_date then stands in.
        let end = second.or_else(|| {
            let days: i64 = self.days.captures(text)?[1].parse().ok()?;
            if !(1..=MAX_LEAVE_DAYS).contains(&days) {
                return None;
            }
            start?.checked_add_signed(Duration::try_days(days - 1)?)
        });
        (start, end)
    }

    fn employee_id(&self, text: &str) -> Option<i64> {
        self.employee_ref.captures(text)?[1].parse().ok()
    }

    fn department(text: &str) -> Option<&'static str> {
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        DEPARTMENTS.iter().find_map(|(key, name)| {
            let parts: Vec<&str> = key.split(' ').collect();
            words
                .windows(parts.len())
                .any(|w| w == parts.as_slice())
                .then_some(*name)
        })
    }

    /// The first run of up to two capitalized non-command words in the original text.
    fn employee_name(&self, original: &str) -> Option<String> {
        if let Some(c) = self.named.captures(original) {
            let mut name = c[1].to_string();
            if let Some(last) = c.get(2).filter(|m| !is_reserved(m.as_str())) {
                name = format!("{} {}", name, last.as_str());
            }
            return Some(title_case(&name));
        }
        let mut run: Vec<&str> = Vec::new();
        for m in self.word.find_iter(original) {
            let word = m.as_str();
            let capitalized = word.chars().next().is_some_and(char::is_uppercase);
            if capitalized && !is_reserved(word) {
                run.push(word);
                if run.len() == 2 {
                    break;
                }
            } else if !run.is_empty() {
                break;
            }
        }
        (!run.is_empty()).then(|| run.join(" "))
    }

    fn payroll_period(&self, text: &str) -> (Option<i64>, Option<i64>) {
        let month = self.month.captures(text).and_then(|c| month_number(&c[1]));
        let year = self.year.captures(text).and_then(|c| c[1].parse().ok());
        (month, year)
    }

    fn leave_reason(&self, text: &str) -> (String, Option<&'static str>) {
        let leave_type = if contains_any(text, &["sick", "illness", "doctor"]) {
            Some("sick")
        } else if contains_any(text, &["vacation", "holiday", "trip"]) {
            Some("vacation")
        } else if contains_any(text, &["personal", "family"]) {
            Some("personal")
        } else {
            None
        };

        let stated = self.reasons.iter().find_map(|re| {
            let reason = re.captures(text)?[1].trim().to_string();
            (!reason.is_empty() && !self.date_only.is_match(&reason)).then_some(reason)
        });
        let reason = stated.unwrap_or_else(|| {
            match leave_type {
                Some("sick") => "Medical leave",
                Some("vacation") => "Vacation",
                Some("personal") => "Personal leave",
                _ => "Leave request",
            }
            .to_string()
        });
        (reason, leave_type)
    }

    fn build(&self, topic: Topic, text: &str, original: &str) -> (String, Map<String, Value>) {
        let today = self.clock.today();
        let mut params = Map::new();
        let employee_id = self.employee_id(text);
        let action = match topic {
            Topic::Attendance => {
                put(&mut params, "employee_id", employee_id.map(Value::from));
                put(&mut params, "date", self.dates(text, today).0.map(iso));
                "view_attendance"
            }
            Topic::ClockIn => "clock_in",
            Topic::ClockOut => "clock_out",
            Topic::Leave if contains_any(text, &["request", "apply", "take"]) => {
                let (start, end) = self.dates(text, today);
                let (reason, leave_type) = self.leave_reason(text);
                put(&mut params, "employee_id", employee_id.map(Value::from));
                put(&mut params, "start_date", start.map(iso));
                put(&mut params, "end_date", end.map(iso));
                put(&mut params, "reason", Some(Value::String(reason)));
                put(&mut params, "leave_type", leave_type.map(Value::from));
                "request_leave"
            }
            Topic::Leave => {
                put(&mut params, "employee_id", employee_id.map(Value::from));
                "view_leave"
            }
            Topic::GeneratePayroll | Topic::Payroll => {
                let (month, year) = self.payroll_period(text);
                put(&mut params, "employee_id", employee_id.map(Value::from));
                put(&mut params, "month", month.map(Value::from));
                put(&mut params, "year", year.map(Value::from));
                if topic == Topic::GeneratePayroll {
                    "generate_payroll"
                } else {
                    "view_payroll"
                }
            }
            Topic::Employee => {
                let name = self.employee_name(original);
                let department = Self::department(text);
                if has_word(text, &["add", "create", "new"]) {
                    put(&mut params, "name", name.map(Value::from));
                    put(&mut params, "department", department.map(Value::from));
                    "create_employee"
                } else if has_word(text, &["find", "search", "show"])
                    && (name.is_some() || employee_id.is_some())
                {
                    put(&mut params, "employee_id", employee_id.map(Value::from));
                    put(&mut params, "employee_name", name.map(Value::from));
                    "get_employee_info"
                } else {
                    put(&mut params, "department", department.map(Value::from));
                    "view_employees"
                }
            }
            Topic::Report => {
                let report_type = ["attendance", "payroll", "performance", "leave"]
                    .into_iter()
                    .find(|t| text.contains(t))
                    .unwrap_or("general");
                put(&mut params, "report_type", Some(Value::from(report_type)));
                put(&mut params, "department", Self::department(text).map(Value::from));
                "generate_report"
            }
        };
        (action.to_string(), params)
    }
}

#[async_trait]
impl IntentRecognizer for PatternRecognizer {
    fn name(&self) -> &str {
        "pattern"
    }

    async fn interpret(
        &self,
        text: &str,
        language: &str,
        _caller: &CallerContext,
    ) -> Result<Intent, RecognitionFailure> {
        let original = text.trim();
        if original.is_empty() {
            return Err(RecognitionFailure::EmptyInput);
        }
        let lowered = original.to_lowercase();

        let Some((topic, confidence)) = self.classify(&lowered) else {
            let mut params = Map::new();
            params.insert("original_text".to_string(), Value::from(lowered));
            let alternatives = ALTERNATIVES.iter().map(|a| a.to_string()).collect();
            return Ok(Intent::new("unknown", params, UNKNOWN_CONFIDENCE, language)
                .with_alternatives(alternatives));
        };

        let (action, params) = self.build(topic, &lowered, original);
        tracing::debug!(action = %action, confidence, "Pattern recognizer matched");
        Ok(Intent::new(action, params, confidence, language))
    }

    async fn probe(&self) -> bool {
        true
    }
}

fn is_reserved(word: &str) -> bool {
    let lower = word.to_lowercase();
    NAME_STOPWORDS.contains(&lower.as_str()) || DEPARTMENTS.iter().any(|(key, _)| *key == lower)
}

fn put(params: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        params.insert(key.to_string(), value);
    }
}

fn iso(date: NaiveDate) -> Value {
    Value::String(date.format("%Y-%m-%d").to_string())
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn has_word(text: &str, words: &[&str]) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| words.contains(&w))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use robohr_core::Role;

    fn recognizer() -> PatternRecognizer {
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        PatternRecognizer::new(Arc::new(FixedClock::new(now))).unwrap()
    }

    async fn interpret(text: &str) -> Intent {
        let caller = CallerContext::new(Some(7), Role::Employee, "en");
        recognizer().interpret(text, "en", &caller).await.unwrap()
    }

    #[tokio::test]
    async fn test_clock_in_is_confident() {
        let intent = interpret("clock in").await;
        assert_eq!(intent.action, "clock_in");
        assert!(intent.parameters.is_empty());
        assert!((intent.confidence - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unrepresentable_leave_span_keeps_start_only() {
        let intent = interpret("request leave tomorrow for 9999999999 days").await;
        assert_eq!(intent.action, "request_leave");
        assert_eq!(intent.parameters["start_date"], "2026-10-20");
        assert!(!intent.parameters.contains_key("end_date"));

        let intent = interpret("request leave tomorrow for 400 days").await;
        assert!(!intent.parameters.contains_key("end_date"));

        let intent = interpret("request leave tomorrow for 366 days").await;
        assert_eq!(intent.parameters["end_date"], "2027-10-20");
    }

    #[tokio::test]
    async fn test_show_my_payroll() {
        let intent = interpret("show my payroll").await;
        assert_eq!(intent.action, "view_payroll");
        assert!(!intent.parameters.contains_key("employee_id"));
    }

    #[tokio::test]
    async fn test_request_leave_with_days_and_reason() {
        let intent = interpret("Request leave tomorrow for 3 days because of a family wedding").await;
        assert_eq!(intent.action, "request_leave");
        assert_eq!(intent.parameters["start_date"], "2026-10-20");
        assert_eq!(intent.parameters["end_date"], "2026-10-22");
        assert_eq!(intent.parameters["reason"], "of a family wedding");
        assert_eq!(intent.parameters["leave_type"], "personal");
    }

    #[tokio::test]
    async fn test_request_leave_explicit_dates() {
        let intent = interpret("please apply leave from 2026-11-02 to 2026-11-04 for sick child").await;
        assert_eq!(intent.action, "request_leave");
        assert_eq!(intent.parameters["start_date"], "2026-11-02");
        assert_eq!(intent.parameters["end_date"], "2026-11-04");
        assert_eq!(intent.parameters["leave_type"], "sick");
    }

    #[tokio::test]
    async fn test_leave_date_is_not_a_reason() {
        let intent = interpret("request leave for tomorrow").await;
        assert_eq!(intent.parameters["reason"], "Leave request");
        assert!(!intent.parameters.contains_key("end_date"));
    }

    #[tokio::test]
    async fn test_find_employee_by_name() {
        let intent = interpret("Find employee John").await;
        assert_eq!(intent.action, "get_employee_info");
        assert_eq!(intent.parameters["employee_name"], "John");

        let intent = interpret("search employees named maria garcia").await;
        assert_eq!(intent.action, "get_employee_info");
        assert_eq!(intent.parameters["employee_name"], "Maria Garcia");
    }

    #[tokio::test]
    async fn test_list_employees_by_department() {
        let intent = interpret("Show employees in Engineering").await;
        assert_eq!(intent.action, "view_employees");
        assert_eq!(intent.parameters["department"], "Engineering");

        let intent = interpret("list employees in hr").await;
        assert_eq!(intent.parameters["department"], "Human Resources");
    }

    #[tokio::test]
    async fn test_generate_payroll_with_period() {
        let intent = interpret("generate payroll for employee 4 for march 2026").await;
        assert_eq!(intent.action, "generate_payroll");
        assert_eq!(intent.parameters["employee_id"], 4);
        assert_eq!(intent.parameters["month"], 3);
        assert_eq!(intent.parameters["year"], 2026);
    }

    #[tokio::test]
    async fn test_keyword_fallback_is_capped() {
        let intent = interpret("money wages salary").await;
        assert_eq!(intent.action, "view_payroll");
        assert!(intent.confidence <= KEYWORD_CEILING);
        assert!((intent.confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let intent = interpret("sing me a song").await;
        assert_eq!(intent.action, "unknown");
        assert!((intent.confidence - UNKNOWN_CONFIDENCE).abs() < 1e-9);
        assert!(!intent.alternatives.is_empty());
    }

    #[tokio::test]
    async fn test_report_is_recognized_but_not_wired() {
        let intent = interpret("generate a report for attendance").await;
        assert_eq!(intent.action, "generate_report");
        assert_eq!(intent.parameters["report_type"], "attendance");
    }

    #[tokio::test]
    async fn test_empty_text() {
        let caller = CallerContext::new(None, Role::Employee, "en");
        let err = recognizer().interpret("  ", "en", &caller).await.unwrap_err();
        assert_eq!(err, RecognitionFailure::EmptyInput);
        assert!(recognizer().probe().await);
    }
}
