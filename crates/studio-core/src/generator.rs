//! Constrained random scenario generation with pairwise exclusion propagation.
//!
//! Each attempt walks the factors in category order, most-constrained factor
//! first within a category, carrying one `excluded` set across the whole
//! attempt. Locked selections are preserved verbatim and propagate their hard
//! exclusions; unlocked factors pick uniformly at random among the options
//! not yet excluded. A factor left without candidates aborts the attempt, and
//! attempts repeat up to a fixed budget. This is a greedy heuristic with
//! bounded retries, not a complete constraint solver: it can miss satisfying
//! assignments that backtracking search would find.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{ConsistencyRelation, Factor, Narrative, OptionValue, Scenario};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Attempts before generation reports exhaustion. An empirical constant,
    /// not a tuned one; problem sizes are tens of factors with low tens of
    /// options each.
    pub max_attempts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { max_attempts: 100 }
    }
}

/// Generate one narrative for the scenario, honoring `locked` selections.
/// Returns `None` when no consistent assignment was found within the attempt
/// budget (generation exhausted — recoverable, the caller may unlock factors
/// and retry).
pub fn generate(
    scenario: &Scenario,
    locked: &BTreeMap<String, Vec<String>>,
    seed: u64,
) -> Option<Narrative> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_with_rng(scenario, locked, &mut rng, &GeneratorConfig::default())
}

/// Same as [`generate`] but with a caller-owned RNG and config, for replays
/// and deterministic tests.
pub fn generate_with_rng(
    scenario: &Scenario,
    locked: &BTreeMap<String, Vec<String>>,
    rng: &mut impl Rng,
    config: &GeneratorConfig,
) -> Option<Narrative> {
    let order = processing_order(scenario);

    for _ in 0..config.max_attempts {
        if let Some(components) = attempt(&order, &scenario.inconsistencies, locked, rng) {
            let token: u64 = rng.random();
            let mut narrative = Narrative::with_id(format!("narrative_{token:016x}"));
            narrative.label = format!("Narrative {:06x}", token & 0x00ff_ffff);
            narrative.components = components;
            return Some(narrative);
        }
    }

    None
}

fn attempt(
    order: &[&Factor],
    relation: &ConsistencyRelation,
    locked: &BTreeMap<String, Vec<String>>,
    rng: &mut impl Rng,
) -> Option<BTreeMap<String, Vec<String>>> {
    let mut chosen = locked.clone();
    let mut excluded: BTreeSet<String> = BTreeSet::new();

    for factor in order {
        if let Some(selection) = locked.get(&factor.id) {
            // A lock colliding with an already-propagated exclusion makes the
            // whole attempt unsatisfiable; retrying cannot help either, but
            // the caller pays at most the attempt budget.
            if selection.iter().any(|id| excluded.contains(id)) {
                return None;
            }
            for option_id in selection {
                propagate(relation, option_id, &mut excluded);
            }
            continue;
        }

        if factor.is_manual() {
            continue;
        }

        let candidates: Vec<&str> = factor
            .values
            .iter()
            .map(|value| value.id.as_str())
            .filter(|id| !excluded.contains(*id))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let pick = candidates[rng.random_range(0..candidates.len())];
        propagate(relation, pick, &mut excluded);
        chosen.insert(factor.id.clone(), vec![pick.to_string()]);
    }

    Some(chosen)
}

/// Only hard exclusions propagate; "improbable" never constrains generation.
fn propagate(relation: &ConsistencyRelation, option_id: &str, excluded: &mut BTreeSet<String>) {
    for partner in relation.hard_partners(option_id) {
        excluded.insert(partner.to_string());
    }
}

/// Raw link count of the factor: how many relation entries (hard and soft)
/// its options participate in. Factors scoring higher are assigned earlier,
/// which keeps late attempt failures rarer.
pub fn constrainedness(factor: &Factor, relation: &ConsistencyRelation) -> usize {
    factor
        .values
        .iter()
        .map(|value| relation.link_count(&value.id))
        .sum()
}

/// Sort factors most-constrained-first; ties fall back to the explicit
/// `order` field, then the id. Exposed separately so the ordering heuristic
/// stays testable without running generation.
pub fn order_factors<'a>(
    mut factors: Vec<&'a Factor>,
    relation: &ConsistencyRelation,
) -> Vec<&'a Factor> {
    factors.sort_by(|a, b| {
        constrainedness(b, relation)
            .cmp(&constrainedness(a, relation))
            .then_with(|| {
                a.order
                    .unwrap_or(i64::MAX)
                    .cmp(&b.order.unwrap_or(i64::MAX))
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    factors
}

/// The full factor walk of one attempt: categories in declared order, each
/// category's factors most-constrained-first, then factors outside every
/// category. Every factor appears exactly once even when category lists
/// overlap; dangling component ids are skipped.
fn processing_order(scenario: &Scenario) -> Vec<&Factor> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut order: Vec<&Factor> = Vec::new();

    for category in &scenario.categories {
        let group: Vec<&Factor> = category
            .component_ids
            .iter()
            .filter_map(|id| scenario.factor(id))
            .filter(|factor| seen.insert(factor.id.as_str()))
            .collect();
        order.extend(order_factors(group, &scenario.inconsistencies));
    }

    let leftovers: Vec<&Factor> = scenario
        .components
        .iter()
        .filter(|factor| seen.insert(factor.id.as_str()))
        .collect();
    order.extend(order_factors(leftovers, &scenario.inconsistencies));

    order
}

/// Options of `factor` still selectable next to an existing partial choice.
/// Hard exclusions always hide an option; improbable ones only when the
/// scenario asks for it (`hide_inconsistent_values`).
pub fn allowed_options<'a>(
    factor: &'a Factor,
    chosen: &BTreeMap<String, Vec<String>>,
    relation: &ConsistencyRelation,
    hide_improbable: bool,
) -> Vec<&'a OptionValue> {
    factor
        .values
        .iter()
        .filter(|value| {
            chosen
                .iter()
                .filter(|(factor_id, _)| **factor_id != factor.id)
                .flat_map(|(_, ids)| ids.iter())
                .all(|picked| {
                    !relation.is_excluded(&value.id, picked)
                        && !(hide_improbable && relation.is_improbable(&value.id, picked))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Category;

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

    fn two_factor_scenario() -> Scenario {
        let mut scenario = Scenario::with_id("s1");
        scenario.components = vec![
            factor("color", &["red", "blue"]),
            factor("size", &["small", "large"]),
        ];
        scenario
            .inconsistencies
            .set_relation("red", "large", Some(true));
        scenario
    }

    #[test]
    fn generated_assignment_respects_hard_exclusions() {
        let scenario = two_factor_scenario();
        for seed in 0..50 {
            let narrative =
                generate(&scenario, &BTreeMap::new(), seed).expect("satisfiable scenario");
            let picks: Vec<&str> = narrative.selected_option_ids().collect();
            assert!(
                !(picks.contains(&"red") && picks.contains(&"large")),
                "seed {seed} produced an excluded pair"
            );
        }
    }

    #[test]
    fn locked_selection_is_preserved_verbatim() {
        let scenario = two_factor_scenario();
        let locked = BTreeMap::from([("color".to_string(), vec!["red".to_string()])]);

        let narrative = generate(&scenario, &locked, 7).expect("red+small remains satisfiable");
        assert_eq!(narrative.components["color"], vec!["red".to_string()]);
        assert_eq!(narrative.components["size"], vec!["small".to_string()]);
    }

    #[test]
    fn conflicting_locks_exhaust_the_attempt_budget() {
        let scenario = two_factor_scenario();
        let locked = BTreeMap::from([
            ("color".to_string(), vec!["red".to_string()]),
            ("size".to_string(), vec!["large".to_string()]),
        ]);

        assert_eq!(generate(&scenario, &locked, 1), None);
    }

    #[test]
    fn manual_factor_is_left_unassigned() {
        let mut scenario = two_factor_scenario();
        scenario.components[1].manual = Some(true);

        let narrative = generate(&scenario, &BTreeMap::new(), 3).expect("color alone generates");
        assert!(narrative.components.contains_key("color"));
        assert!(!narrative.components.contains_key("size"));
    }

    #[test]
    fn manual_factor_can_still_be_locked() {
        let mut scenario = two_factor_scenario();
        scenario.components[1].manual = Some(true);
        let locked = BTreeMap::from([("size".to_string(), vec!["large".to_string()])]);

        let narrative = generate(&scenario, &locked, 3).expect("blue+large satisfiable");
        assert_eq!(narrative.components["size"], vec!["large".to_string()]);
        assert_eq!(narrative.components["color"], vec!["blue".to_string()]);
    }

    #[test]
    fn unsatisfiable_scenario_returns_none() {
        let mut scenario = Scenario::with_id("s1");
        scenario.components = vec![factor("a", &["a1"]), factor("b", &["b1"])];
        scenario.inconsistencies.set_relation("a1", "b1", Some(true));

        assert_eq!(generate(&scenario, &BTreeMap::new(), 0), None);
    }

    #[test]
    fn factor_without_options_fails_generation() {
        let mut scenario = Scenario::with_id("s1");
        scenario.components = vec![factor("empty", &[])];

        assert_eq!(generate(&scenario, &BTreeMap::new(), 0), None);
    }

    #[test]
    fn improbable_pairs_do_not_constrain_generation() {
        let mut scenario = Scenario::with_id("s1");
        scenario.components = vec![factor("a", &["a1"]), factor("b", &["b1"])];
        scenario
            .inconsistencies
            .set_relation("a1", "b1", Some(false));

        let narrative = generate(&scenario, &BTreeMap::new(), 0).expect("soft pair still allowed");
        assert_eq!(narrative.components["a"], vec!["a1".to_string()]);
        assert_eq!(narrative.components["b"], vec!["b1".to_string()]);
    }

    #[test]
    fn most_constrained_factor_is_ordered_first() {
        let mut relation = ConsistencyRelation::new();
        relation.set_relation("busy1", "x", Some(true));
        relation.set_relation("busy1", "y", Some(false));
        relation.set_relation("calm1", "x", Some(true));

        let busy = factor("busy", &["busy1"]);
        let calm = factor("calm", &["calm1"]);
        let free = factor("free", &["free1"]);

        let ordered = order_factors(vec![&free, &calm, &busy], &relation);
        let ids: Vec<&str> = ordered.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["busy", "calm", "free"]);
    }

    #[test]
    fn ordering_ties_fall_back_to_order_field_then_id() {
        let relation = ConsistencyRelation::new();
        let mut first = factor("zeta", &["z1"]);
        first.order = Some(1);
        let second = factor("alpha", &["a1"]);

        let ordered = order_factors(vec![&second, &first], &relation);
        let ids: Vec<&str> = ordered.iter().map(|f| f.id.as_str()).collect();
        // Explicit order beats the id fallback.
        assert_eq!(ids, vec!["zeta", "alpha"]);
    }

    #[test]
    fn category_order_precedes_constrainedness() {
        let mut scenario = two_factor_scenario();
        // size is unconstrained, color carries the red-large link; putting
        // size's category first must still process size before color.
        scenario.categories = vec![
            Category {
                id: "c_size".to_string(),
                label: "Size".to_string(),
                desc: None,
                decision_support: None,
                component_ids: vec!["size".to_string()],
            },
            Category {
                id: "c_color".to_string(),
                label: "Color".to_string(),
                desc: None,
                decision_support: None,
                component_ids: vec!["color".to_string()],
            },
        ];

        let ids: Vec<&str> = processing_order(&scenario)
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, vec!["size", "color"]);
    }

    #[test]
    fn overlapping_categories_process_each_factor_once() {
        let mut scenario = two_factor_scenario();
        scenario.categories = vec![
            Category {
                id: "c1".to_string(),
                label: "C1".to_string(),
                desc: None,
                decision_support: None,
                component_ids: vec!["color".to_string(), "size".to_string()],
            },
            Category {
                id: "c2".to_string(),
                label: "C2".to_string(),
                desc: None,
                decision_support: None,
                component_ids: vec!["color".to_string(), "missing".to_string()],
            },
        ];

        assert_eq!(processing_order(&scenario).len(), 2);
    }

    #[test]
    fn allowed_options_hides_improbable_only_on_request() {
        let mut scenario = two_factor_scenario();
        scenario
            .inconsistencies
            .set_relation("blue", "large", Some(false));
        let chosen = BTreeMap::from([("size".to_string(), vec!["large".to_string()])]);
        let color = scenario.factor("color").unwrap();

        let visible = allowed_options(color, &chosen, &scenario.inconsistencies, false);
        let ids: Vec<&str> = visible.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["blue"]);

        let filtered = allowed_options(color, &chosen, &scenario.inconsistencies, true);
        assert!(filtered.is_empty());
    }
}
