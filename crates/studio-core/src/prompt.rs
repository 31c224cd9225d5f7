//! Deterministic plain-text prompt rendering for the text-generation seam.
//!
//! The prompt lists the narrative's selected options factor by factor, in
//! category order, so repeated calls for the same narrative produce the same
//! text. The scenario's free-form template, when present, leads the prompt.

use std::fmt::Write as _;

use contracts::{Narrative, Scenario};

pub fn render_prompt(scenario: &Scenario, narrative: &Narrative) -> String {
    let mut prompt = String::new();

    if let Some(template) = scenario.template.as_deref() {
        let template = template.trim();
        if !template.is_empty() {
            prompt.push_str(template);
            prompt.push_str("\n\n");
        }
    }

    let _ = writeln!(prompt, "Scenario: {}", narrative.label);

    let mut listed: Vec<&str> = Vec::new();
    for category in &scenario.categories {
        for factor_id in &category.component_ids {
            if !listed.contains(&factor_id.as_str()) {
                listed.push(factor_id);
            }
        }
    }
    for factor in &scenario.components {
        if !listed.contains(&factor.id.as_str()) {
            listed.push(&factor.id);
        }
    }

    for factor_id in listed {
        let Some(factor) = scenario.factor(factor_id) else {
            continue;
        };
        let Some(selection) = narrative.components.get(factor_id) else {
            continue;
        };

        let labels: Vec<&str> = selection
            .iter()
            .filter_map(|option_id| factor.option(option_id))
            .map(|option| option.label.as_str())
            .collect();
        if labels.is_empty() {
            continue;
        }
        let _ = writeln!(prompt, "{}: {}", factor.label, labels.join(", "));
    }

    prompt
}
