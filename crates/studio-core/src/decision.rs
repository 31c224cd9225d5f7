//! Decision support: weighted-plurality vote across included narratives.
//!
//! Every selected narrative votes on every factor it touches; its vote weight
//! is its risk ordinal plus one, so riskier scenarios count more and even an
//! unrated narrative contributes one vote. Per factor the winning selection
//! is the set of all options at the maximum tally (ties preserved).

use std::collections::BTreeMap;

use contracts::{Factor, Narrative};

use crate::risk;

/// Well-known id of the synthetic recommendation narrative.
pub const SUGGESTED_APPROACH_ID: &str = "suggested_approach";

/// Pseudo-factors that carry risk bookkeeping rather than scenario content;
/// they never participate in the vote.
pub const RESERVED_FACTOR_IDS: [&str; 3] = ["probability", "impact", "risk"];

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionBreakdown {
    pub suggested: Narrative,
    /// factor id → option id → accumulated weight, for the factors that
    /// received at least one vote.
    pub tallies: BTreeMap<String, BTreeMap<String, u64>>,
}

/// Vote weight of a narrative: trailing ordinal of its `risk_<n>` id plus
/// one. Absent or malformed risk ids fall back to the minimum weight rather
/// than failing — aggregation is a summary, not a validation pass.
pub fn narrative_weight(narrative: &Narrative) -> u64 {
    let ordinal = narrative
        .risk
        .as_deref()
        .and_then(|id| risk::parse_ordinal(id, "risk").ok())
        .unwrap_or(0);
    u64::from(ordinal) + 1
}

/// Aggregate the selected narratives into the suggested-approach narrative.
/// `selected` is expected to be pre-filtered to `included = true` and sorted
/// by label; [`select_included`] does both.
pub fn aggregate(selected: &[Narrative], factors: &[Factor]) -> Narrative {
    aggregate_with_tallies(selected, factors).suggested
}

/// [`aggregate`] plus the per-factor tallies, for surfaces that explain the
/// recommendation.
pub fn aggregate_with_tallies(selected: &[Narrative], factors: &[Factor]) -> DecisionBreakdown {
    let weights: Vec<u64> = selected.iter().map(narrative_weight).collect();
    let mut tallies: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    let mut suggested = Narrative::with_id(SUGGESTED_APPROACH_ID);
    suggested.label = "Suggested approach".to_string();
    suggested.included = true;

    for factor in factors {
        if RESERVED_FACTOR_IDS.contains(&factor.id.as_str()) {
            continue;
        }

        let mut tally: BTreeMap<String, u64> = BTreeMap::new();
        for (narrative, weight) in selected.iter().zip(&weights) {
            let Some(selection) = narrative.components.get(&factor.id) else {
                continue;
            };
            for option_id in selection {
                // Multi-selects grant each option the full weight, not a share.
                *tally.entry(option_id.clone()).or_default() += weight;
            }
        }

        let Some(high_score) = tally.values().copied().max() else {
            continue;
        };
        let winners: Vec<String> = tally
            .iter()
            .filter(|(_, score)| **score == high_score)
            .map(|(option_id, _)| option_id.clone())
            .collect();

        suggested.components.insert(factor.id.clone(), winners);
        tallies.insert(factor.id.clone(), tally);
    }

    DecisionBreakdown { suggested, tallies }
}

/// The aggregation input set: included narratives from the pool, sorted by
/// label (id as tie-break so equal labels keep a stable order).
pub fn select_included(narratives: &[Narrative]) -> Vec<Narrative> {
    let mut selected: Vec<Narrative> = narratives
        .iter()
        .filter(|narrative| narrative.included)
        .cloned()
        .collect();
    selected.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.id.cmp(&b.id)));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::OptionValue;

    fn factor(id: &str, option_ids: &[&str]) -> Factor {
        Factor {
            id: id.to_string(),
            label: id.to_uppercase(),
            desc: None,
            order: None,
            manual: None,
            values: option_ids
                .iter()
                .map(|option_id| OptionValue {
                    id: option_id.to_string(),
                    label: option_id.to_string(),
                    desc: None,
                })
                .collect(),
            contexts: None,
        }
    }

    fn voting_narrative(id: &str, factor_id: &str, option_ids: &[&str], risk: Option<&str>) -> Narrative {
        let mut narrative = Narrative::with_id(id);
        narrative.included = true;
        narrative.risk = risk.map(str::to_string);
        narrative.components.insert(
            factor_id.to_string(),
            option_ids.iter().map(|s| s.to_string()).collect(),
        );
        narrative
    }

    #[test]
    fn weight_is_risk_ordinal_plus_one() {
        assert_eq!(
            narrative_weight(&voting_narrative("n", "f", &[], Some("risk_4"))),
            5
        );
        assert_eq!(narrative_weight(&voting_narrative("n", "f", &[], None)), 1);
        assert_eq!(
            narrative_weight(&voting_narrative("n", "f", &[], Some("garbage"))),
            1
        );
    }

    #[test]
    fn higher_weight_beats_equal_vote_count() {
        let factors = vec![factor("f", &["a", "b"])];
        let selected = vec![
            voting_narrative("n1", "f", &["a"], Some("risk_0")),
            voting_narrative("n2", "f", &["b"], Some("risk_4")),
        ];

        let suggested = aggregate(&selected, &factors);
        assert_eq!(suggested.components["f"], vec!["b".to_string()]);
        assert_eq!(suggested.id, SUGGESTED_APPROACH_ID);
        assert!(suggested.included);
        assert!(!suggested.saved);
    }

    #[test]
    fn ties_keep_every_winner() {
        let factors = vec![factor("f", &["a", "b", "c"])];
        let selected = vec![
            voting_narrative("n1", "f", &["a"], Some("risk_1")),
            voting_narrative("n2", "f", &["b"], Some("risk_1")),
            voting_narrative("n3", "f", &["c"], Some("risk_0")),
        ];

        let suggested = aggregate(&selected, &factors);
        assert_eq!(
            suggested.components["f"],
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn multi_select_grants_full_weight_per_option() {
        let factors = vec![factor("f", &["a", "b"])];
        let selected = vec![
            voting_narrative("n1", "f", &["a", "b"], Some("risk_1")),
            voting_narrative("n2", "f", &["b"], None),
        ];

        let breakdown = aggregate_with_tallies(&selected, &factors);
        assert_eq!(breakdown.tallies["f"]["a"], 2);
        assert_eq!(breakdown.tallies["f"]["b"], 3);
        assert_eq!(breakdown.suggested.components["f"], vec!["b".to_string()]);
    }

    #[test]
    fn untouched_factors_stay_absent() {
        let factors = vec![factor("f", &["a"]), factor("silent", &["x"])];
        let selected = vec![voting_narrative("n1", "f", &["a"], None)];

        let suggested = aggregate(&selected, &factors);
        assert!(suggested.components.contains_key("f"));
        assert!(!suggested.components.contains_key("silent"));
    }

    #[test]
    fn reserved_bookkeeping_factors_never_vote() {
        let factors = vec![factor("risk", &["risk_1"]), factor("f", &["a"])];
        let mut narrative = voting_narrative("n1", "f", &["a"], None);
        narrative
            .components
            .insert("risk".to_string(), vec!["risk_1".to_string()]);

        let suggested = aggregate(&[narrative], &factors);
        assert!(!suggested.components.contains_key("risk"));
    }

    #[test]
    fn select_included_filters_and_sorts_by_label() {
        let mut excluded = voting_narrative("n0", "f", &["a"], None);
        excluded.included = false;
        let mut zulu = voting_narrative("n1", "f", &["a"], None);
        zulu.label = "Zulu".to_string();
        let mut alpha = voting_narrative("n2", "f", &["b"], None);
        alpha.label = "Alpha".to_string();

        let selected = select_included(&[excluded, zulu, alpha]);
        let labels: Vec<&str> = selected.iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["Alpha", "Zulu"]);
    }
}
