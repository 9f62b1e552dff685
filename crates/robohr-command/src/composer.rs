//! Response composer.
//!
//! Renders a [`CommandResult`] as text in the caller's language and decides
//! whether the text is suitable for speech. Templates exist for English,
//! Spanish and French; any other language renders in English.

use robohr_core::{CommandResult, ErrorKind};
use serde::Serialize;
use serde_json::Value;

/// What the caller sees (and may hear).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserResponse {
    pub text: String,
    /// False when the text stands for a listing too long to read aloud.
    pub speakable: bool,
    /// Short text to speak instead of `text` when `speakable` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoken_summary: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ErrorKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lang {
    En,
    Es,
    Fr,
}

impl Lang {
    fn from_code(code: &str) -> Self {
        let primary = code
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "es" => Lang::Es,
            "fr" => Lang::Fr,
            _ => Lang::En,
        }
    }

    fn catalog(self) -> &'static Catalog {
        match self {
            Lang::En => &EN,
            Lang::Es => &ES,
            Lang::Fr => &FR,
        }
    }
}

struct Catalog {
    service_unavailable: &'static str,
    unknown_action: &'static str,
    missing_parameter: &'static str,
    forbidden: &'static str,
    not_found: &'static str,
    unclear: &'static str,
    unclear_options: &'static str,
    low_confidence_note: &'static str,
    list_summary: &'static str,
    records_found: &'static str,
    clocked_in: &'static str,
    clocked_out: &'static str,
    leave_submitted: &'static str,
    payroll_generated: &'static str,
    employee_info: &'static str,
}

const EN: Catalog = Catalog {
    service_unavailable: "AI service unavailable. Please try again later.",
    unknown_action: "The command '{action}' was recognized but not implemented.",
    missing_parameter: "I need more information: {message}",
    forbidden: "Sorry, you are not allowed to do that.",
    not_found: "I couldn't find that: {message}",
    unclear: "I'm not sure what you meant. Please rephrase the command.",
    unclear_options: "I'm not sure what you meant. Did you mean: {options}?",
    low_confidence_note: "(I wasn't fully sure I understood this command.)",
    list_summary: "Found {count} records. The full list is shown on screen.",
    records_found: "Found {count} records.",
    clocked_in: "Successfully clocked in at {time}.",
    clocked_out: "Successfully clocked out at {time}.",
    leave_submitted: "Leave request submitted from {start} to {end}.",
    payroll_generated: "Payroll generated for {period}.",
    employee_info: "Here is the information for {name}.",
};

const ES: Catalog = Catalog {
    service_unavailable: "Servicio de IA no disponible. Inténtelo de nuevo más tarde.",
    unknown_action: "El comando '{action}' fue reconocido pero no está implementado.",
    missing_parameter: "Necesito más información: {message}",
    forbidden: "Lo siento, no tiene permiso para hacer eso.",
    not_found: "No encontré lo solicitado: {message}",
    unclear: "No estoy seguro de lo que quiso decir. Reformule el comando.",
    unclear_options: "No estoy seguro de lo que quiso decir. ¿Quiso decir: {options}?",
    low_confidence_note: "(No estaba del todo seguro de haber entendido este comando.)",
    list_summary: "Se encontraron {count} registros. La lista completa se muestra en pantalla.",
    records_found: "Se encontraron {count} registros.",
    clocked_in: "Entrada registrada a las {time}.",
    clocked_out: "Salida registrada a las {time}.",
    leave_submitted: "Solicitud de permiso enviada del {start} al {end}.",
    payroll_generated: "Nómina generada para {period}.",
    employee_info: "Esta es la información de {name}.",
};

const FR: Catalog = Catalog {
    service_unavailable: "Service d'IA indisponible. Veuillez réessayer plus tard.",
    unknown_action: "La commande '{action}' a été reconnue mais n'est pas implémentée.",
    missing_parameter: "J'ai besoin de plus d'informations : {message}",
    forbidden: "Désolé, vous n'êtes pas autorisé à faire cela.",
    not_found: "Introuvable : {message}",
    unclear: "Je ne suis pas sûr d'avoir compris. Veuillez reformuler la commande.",
    unclear_options: "Je ne suis pas sûr d'avoir compris. Vouliez-vous dire : {options} ?",
    low_confidence_note: "(Je n'étais pas tout à fait sûr d'avoir compris cette commande.)",
    list_summary: "{count} enregistrements trouvés. La liste complète est affichée à l'écran.",
    records_found: "{count} enregistrements trouvés.",
    clocked_in: "Arrivée enregistrée à {time}.",
    clocked_out: "Départ enregistré à {time}.",
    leave_submitted: "Demande de congé envoyée du {start} au {end}.",
    payroll_generated: "Paie générée pour {period}.",
    employee_info: "Voici les informations sur {name}.",
};

fn fill(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{}}}", key), value)
    })
}

#[derive(Debug, Clone)]
pub struct ResponseComposer {
    speakable_record_limit: usize,
}

impl ResponseComposer {
    pub fn new(speakable_record_limit: usize) -> Self {
        Self {
            speakable_record_limit,
        }
    }

    pub fn compose(&self, result: &CommandResult, language: &str) -> UserResponse {
        let lang = Lang::from_code(language);
        let catalog = lang.catalog();

        let mut text = if result.success {
            success_text(lang, result)
        } else {
            failure_text(catalog, result)
        };
        let low_confidence = result.is_flagged(ErrorKind::RecognitionLowConfidence);
        if low_confidence && result.success {
            text = format!("{} {}", text, catalog.low_confidence_note);
        }

        let (speakable, spoken_summary) = match result.record_count() {
            Some(count) if result.success && count > self.speakable_record_limit => {
                let summary = fill(catalog.list_summary, &[("count", &count.to_string())]);
                (false, Some(summary))
            }
            _ => (true, None),
        };

        let mut flags = result.flags.clone();
        if result.error_kind == Some(ErrorKind::RecognitionLowConfidence) && !low_confidence {
            flags.push(ErrorKind::RecognitionLowConfidence);
        }

        UserResponse {
            text,
            speakable,
            spoken_summary,
            flags,
        }
    }
}

impl Default for ResponseComposer {
    fn default() -> Self {
        Self::new(3)
    }
}

fn failure_text(catalog: &Catalog, result: &CommandResult) -> String {
    let Some(kind) = result.error_kind else {
        return result.message.clone();
    };
    match kind {
        ErrorKind::ServiceUnavailable => catalog.service_unavailable.to_string(),
        ErrorKind::UnknownAction => fill(catalog.unknown_action, &[("action", &result.action)]),
        ErrorKind::MissingParameter => fill(catalog.missing_parameter, &[("message", &result.message)]),
        ErrorKind::Forbidden => catalog.forbidden.to_string(),
        ErrorKind::NotFound => fill(catalog.not_found, &[("message", &result.message)]),
        ErrorKind::DomainRejected => result.message.clone(),
        ErrorKind::RecognitionLowConfidence => {
            let options: Vec<&str> = result
                .data
                .as_ref()
                .and_then(|d| d.get("alternatives"))
                .and_then(Value::as_array)
                .map(|alts| alts.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            if options.is_empty() {
                catalog.unclear.to_string()
            } else {
                fill(catalog.unclear_options, &[("options", &options.join(", "))])
            }
        }
    }
}

/// Handler messages are written in English; other languages re-render from the data.
fn success_text(lang: Lang, result: &CommandResult) -> String {
    if lang == Lang::En {
        return result.message.clone();
    }
    let catalog = lang.catalog();
    let data = result.data.as_ref();
    let field = |name: &str| -> String {
        data.and_then(|d| d.get(name))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    };

    if let Some(count) = result.record_count() {
        return fill(catalog.records_found, &[("count", &count.to_string())]);
    }
    match result.action.as_str() {
        "clock_in" => fill(catalog.clocked_in, &[("time", &clock_time(&field("clock_in")))]),
        "clock_out" => fill(catalog.clocked_out, &[("time", &clock_time(&field("clock_out")))]),
        "request_leave" => fill(
            catalog.leave_submitted,
            &[("start", &field("start_date")), ("end", &field("end_date"))],
        ),
        "generate_payroll" => {
            let period = format!("{:0>2}/{}", field("month"), field("year"));
            fill(catalog.payroll_generated, &[("period", &period)])
        }
        "get_employee_info" => {
            let name = format!("{} {}", field("first_name"), field("last_name"));
            fill(catalog.employee_info, &[("name", name.trim())])
        }
        _ => result.message.clone(),
    }
}

/// `HH:MM` out of an ISO timestamp.
fn clock_time(timestamp: &str) -> String {
    timestamp
        .split('T')
        .nth(1)
        .map(|t| t.chars().take(5).collect())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn composer() -> ResponseComposer {
        ResponseComposer::new(3)
    }

    #[test]
    fn test_english_success_uses_handler_message() {
        let result = CommandResult::success(
            "clock_in",
            Some(json!({"clock_in": "2026-10-19T09:05:00"})),
            "Successfully clocked in at 09:05",
        );
        let response = composer().compose(&result, "en");
        assert_eq!(response.text, "Successfully clocked in at 09:05");
        assert!(response.speakable);
        assert!(response.flags.is_empty());
    }

    #[test]
    fn test_spanish_and_french_success() {
        let result = CommandResult::success(
            "clock_in",
            Some(json!({"clock_in": "2026-10-19T09:05:00"})),
            "Successfully clocked in at 09:05",
        );
        assert_eq!(composer().compose(&result, "es").text, "Entrada registrada a las 09:05.");
        assert_eq!(composer().compose(&result, "fr-FR").text, "Arrivée enregistrée à 09:05.");
    }

    #[test]
    fn test_unsupported_language_falls_back_to_english() {
        let result = CommandResult::failure("x", ErrorKind::ServiceUnavailable, "timeout");
        assert_eq!(
            composer().compose(&result, "de").text,
            "AI service unavailable. Please try again later."
        );
    }

    #[test]
    fn test_forbidden_never_leaks_reason() {
        let result = CommandResult::failure(
            "view_payroll",
            ErrorKind::Forbidden,
            "Role 'employee' may not run 'view_payroll' for employee 3",
        );
        let response = composer().compose(&result, "en");
        assert!(!response.text.contains("employee 3"));
        assert_eq!(response.text, "Sorry, you are not allowed to do that.");
    }

    #[test]
    fn test_domain_rejection_is_verbatim() {
        let result = CommandResult::failure("clock_in", ErrorKind::DomainRejected, "Employee is already clocked in");
        assert_eq!(composer().compose(&result, "fr").text, "Employee is already clocked in");
    }

    #[test]
    fn test_unknown_action_names_the_action() {
        let result = CommandResult::failure("generate_report", ErrorKind::UnknownAction, "x");
        let text = composer().compose(&result, "en").text;
        assert!(text.contains("'generate_report'"));
        assert!(text.contains("recognized but not implemented"));
    }

    #[test]
    fn test_long_listing_is_not_speakable() {
        let result = CommandResult::success("view_payroll", Some(json!([1, 2, 3, 4, 5, 6])), "Found 6 payroll entries");
        let response = composer().compose(&result, "en");
        assert!(!response.speakable);
        assert_eq!(
            response.spoken_summary.as_deref(),
            Some("Found 6 records. The full list is shown on screen.")
        );
        assert_eq!(response.text, "Found 6 payroll entries");

        let short = CommandResult::success("view_payroll", Some(json!([1, 2])), "Found 2 payroll entries");
        assert!(composer().compose(&short, "en").speakable);
    }

    #[test]
    fn test_low_confidence_flag_is_carried() {
        let result = CommandResult::success("clock_in", None, "Successfully clocked in at 09:05")
            .with_flag(ErrorKind::RecognitionLowConfidence);
        let response = composer().compose(&result, "en");
        assert!(response.text.ends_with("(I wasn't fully sure I understood this command.)"));
        assert_eq!(response.flags, vec![ErrorKind::RecognitionLowConfidence]);
    }

    #[test]
    fn test_clarification_offers_alternatives() {
        let mut result = CommandResult::failure("clock_in", ErrorKind::RecognitionLowConfidence, "low");
        result.data = Some(json!({"alternatives": ["clock_out", "view_attendance"]}));
        let response = composer().compose(&result, "en");
        assert_eq!(
            response.text,
            "I'm not sure what you meant. Did you mean: clock_out, view_attendance?"
        );
        assert_eq!(response.flags, vec![ErrorKind::RecognitionLowConfidence]);
    }
}
