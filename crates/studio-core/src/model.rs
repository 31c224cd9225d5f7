//! Factor-model normalization: the invariants every loaded scenario satisfies
//! before any other core function touches it.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{DataModel, Narrative, Scenario, ThresholdColor, MODEL_VERSION};

use crate::validator;

/// What normalization had to repair. All repairs are silent by design; the
/// report exists so the API surface can tell the caller what was healed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub defaulted_ids: usize,
    pub defaulted_labels: usize,
    pub dropped_option_refs: usize,
    pub healed_relation_entries: usize,
}

impl NormalizeReport {
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    fn absorb(&mut self, other: NormalizeReport) {
        self.defaulted_ids += other.defaulted_ids;
        self.defaulted_labels += other.defaulted_labels;
        self.dropped_option_refs += other.dropped_option_refs;
        self.healed_relation_entries += other.healed_relation_entries;
    }
}

/// Normalize the whole persisted envelope: the active scenario, every
/// alternate, and the version tag.
pub fn normalize(model: &mut DataModel) -> NormalizeReport {
    let mut report = normalize_scenario(&mut model.scenario);
    for scenario in &mut model.scenarios {
        report.absorb(normalize_scenario(scenario));
    }
    model.version = MODEL_VERSION;
    report
}

/// Enforce the scenario invariants in place:
/// every factor, category, narrative, and option carries a non-empty id and
/// label; narrative selections reference only existing options; the relation
/// is symmetric; thresholds are sorted ascending.
pub fn normalize_scenario(scenario: &mut Scenario) -> NormalizeReport {
    let mut report = NormalizeReport::default();

    let mut taken: BTreeSet<String> = scenario
        .components
        .iter()
        .map(|factor| factor.id.clone())
        .chain(scenario.categories.iter().map(|c| c.id.clone()))
        .chain(scenario.narratives.iter().map(|n| n.id.clone()))
        .filter(|id| !id.is_empty())
        .collect();

    for factor in &mut scenario.components {
        fill_identity(&mut factor.id, &mut factor.label, "factor", &mut taken, &mut report);
        let mut option_ids: BTreeSet<String> = factor
            .values
            .iter()
            .map(|value| value.id.clone())
            .filter(|id| !id.is_empty())
            .collect();
        for value in &mut factor.values {
            fill_identity(&mut value.id, &mut value.label, "value", &mut option_ids, &mut report);
        }
    }

    for category in &mut scenario.categories {
        fill_identity(&mut category.id, &mut category.label, "category", &mut taken, &mut report);
    }

    for narrative in &mut scenario.narratives {
        fill_identity(&mut narrative.id, &mut narrative.label, "narrative", &mut taken, &mut report);
    }

    // Drop references to options edited or deleted since the narrative was saved.
    for narrative in &mut scenario.narratives {
        let repaired = validator::validate(narrative, &scenario.components);
        report.dropped_option_refs += reference_count(narrative) - reference_count(&repaired);
        *narrative = repaired;
    }

    report.healed_relation_entries += scenario.inconsistencies.heal_symmetry();
    scenario
        .threshold_colors
        .sort_by_key(|entry| entry.threshold);

    report
}

fn reference_count(narrative: &Narrative) -> usize {
    narrative.components.values().map(Vec::len).sum::<usize>() + narrative.components.len()
}

fn fill_identity(
    id: &mut String,
    label: &mut String,
    kind: &str,
    taken: &mut BTreeSet<String>,
    report: &mut NormalizeReport,
) {
    if id.is_empty() {
        let mut counter = taken.len() + 1;
        let mut candidate = format!("{kind}_{counter}");
        while taken.contains(&candidate) {
            counter += 1;
            candidate = format!("{kind}_{counter}");
        }
        *id = candidate;
        report.defaulted_ids += 1;
    }
    taken.insert(id.clone());

    if label.is_empty() {
        *label = id.clone();
        report.defaulted_labels += 1;
    }
}

/// The color of the highest threshold at or below the usage count, if any.
/// Expects thresholds sorted ascending (normalization guarantees it).
pub fn color_for_count(colors: &[ThresholdColor], count: u64) -> Option<&str> {
    colors
        .iter()
        .take_while(|entry| entry.threshold <= count)
        .last()
        .map(|entry| entry.color.as_str())
}

/// Per-option usage over the included narratives: the tally behind the
/// home-summary threshold coloring.
pub fn option_usage(narratives: &[Narrative]) -> BTreeMap<String, u64> {
    let mut usage: BTreeMap<String, u64> = BTreeMap::new();
    for narrative in narratives.iter().filter(|n| n.included) {
        for option_id in narrative.selected_option_ids() {
            *usage.entry(option_id.to_string()).or_default() += 1;
        }
    }
    usage
}
