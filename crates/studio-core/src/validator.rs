//! Stale-reference repair for narratives loaded against an edited model.
//!
//! Factors and options may have been renamed or deleted since a narrative was
//! saved. Validation silently drops selections of options that no longer
//! exist — an idempotent repair, deliberately not an error signal.

use contracts::{Factor, Narrative};

/// Return a copy of the narrative whose component selections reference only
/// options that still exist. Factors absent from the narrative stay absent;
/// entries for factor ids no longer in the model are dropped entirely.
pub fn validate(narrative: &Narrative, factors: &[Factor]) -> Narrative {
    let mut repaired = narrative.clone();
    repaired.components.clear();

    for factor in factors {
        let Some(selection) = narrative.components.get(&factor.id) else {
            continue;
        };
        let existing: Vec<String> = selection
            .iter()
            .filter(|option_id| factor.has_option(option_id))
            .cloned()
            .collect();
        repaired.components.insert(factor.id.clone(), existing);
    }

    repaired
}
