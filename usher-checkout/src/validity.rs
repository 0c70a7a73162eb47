use regex::Regex;
use std::sync::OnceLock;
use usher_catalog::{Catalog, FieldSpec, FieldType, Selection, UnitAnswers};

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"))
}

/// RFC-simple email check: something@something.tld, no whitespace
pub fn is_valid_email(email: &str) -> bool {
    let trimmed = email.trim();
    !trimmed.is_empty() && email_regex().is_match(trimmed)
}

/// Strip formatting from a phone answer; valid only at exactly 10 digits.
pub fn normalize_tel(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        Some(digits)
    } else {
        None
    }
}

fn field_ok(spec: &FieldSpec, value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => !spec.required,
        Some(answer) => match spec.field_type {
            FieldType::Tel => normalize_tel(answer).is_some(),
            _ => true,
        },
    }
}

/// Whether one purchased unit has every required field answered. Used both
/// by the submission gate and by the sync payload builder, which drops
/// incomplete units rather than submitting them partially.
pub fn unit_complete(fields: &[FieldSpec], answers: &UnitAnswers) -> bool {
    fields
        .iter()
        .all(|spec| field_ok(spec, answers.get(&spec.label).map(String::as_str)))
}

/// The submission-gate predicate. Pure, never errors; recomputed after
/// every relevant mutation before submit actions are enabled.
pub fn check(catalog: &Catalog, selection: &Selection, email: &str) -> bool {
    if !is_valid_email(email) {
        return false;
    }

    // If the event sells tickets at all, at least one must be selected.
    if catalog.has_tickets() && !selection.has_any_ticket() {
        return false;
    }

    // Every selected unit of a custom-field item must be complete.
    let empty = UnitAnswers::new();
    for ticket in &catalog.tickets {
        let qty = selection.ticket_qty(ticket.id);
        if qty == 0 || ticket.custom_fields.is_empty() {
            continue;
        }
        let units = selection.answers_for(ticket.id);
        for index in 0..qty as usize {
            if !unit_complete(&ticket.custom_fields, units.get(index).unwrap_or(&empty)) {
                return false;
            }
        }
    }
    for offer in &catalog.offers {
        let qty = selection.offer_qty(offer.id);
        if qty == 0 || offer.custom_fields.is_empty() {
            continue;
        }
        let units = selection.answers_for(offer.id);
        for index in 0..qty as usize {
            if !unit_complete(&offer.custom_fields, units.get(index).unwrap_or(&empty)) {
                return false;
            }
        }
    }

    true
}
