use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Answers for one purchased unit, keyed by field label.
pub type UnitAnswers = HashMap<String, String>;

/// The buyer's current picks: ticket and offer quantities plus per-unit
/// custom-field answers. Pure data; all clamping and resizing rules live
/// in the checkout SelectionStore.
///
/// Invariant maintained by the store: for any item with custom fields,
/// `answers[item].len() == selected quantity`, and quantity decreases
/// only ever drop units from the tail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selection {
    pub tickets: HashMap<Uuid, i32>,
    pub offers: HashMap<Uuid, i32>,
    pub answers: HashMap<Uuid, Vec<UnitAnswers>>,
}

impl Selection {
    pub fn ticket_qty(&self, id: Uuid) -> i32 {
        self.tickets.get(&id).copied().unwrap_or(0)
    }

    pub fn offer_qty(&self, id: Uuid) -> i32 {
        self.offers.get(&id).copied().unwrap_or(0)
    }

    pub fn total_tickets(&self) -> i32 {
        self.tickets.values().sum()
    }

    pub fn has_any_ticket(&self) -> bool {
        self.total_tickets() > 0
    }

    pub fn answers_for(&self, item_id: Uuid) -> &[UnitAnswers] {
        self.answers.get(&item_id).map_or(&[], |units| units.as_slice())
    }

    pub fn answer(&self, item_id: Uuid, unit_index: usize, label: &str) -> Option<&str> {
        self.answers
            .get(&item_id)?
            .get(unit_index)?
            .get(label)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantities_default_to_zero() {
        let selection = Selection::default();
        assert_eq!(selection.ticket_qty(Uuid::new_v4()), 0);
        assert_eq!(selection.total_tickets(), 0);
        assert!(!selection.has_any_ticket());
    }

    #[test]
    fn test_answer_lookup() {
        let mut selection = Selection::default();
        let item = Uuid::new_v4();
        let mut unit = UnitAnswers::new();
        unit.insert("Shirt size".to_string(), "M".to_string());
        selection.answers.insert(item, vec![unit]);

        assert_eq!(selection.answer(item, 0, "Shirt size"), Some("M"));
        assert_eq!(selection.answer(item, 1, "Shirt size"), None);
        assert_eq!(selection.answer(item, 0, "Color"), None);
    }
}
