//! One-shot conversion of the legacy persisted shape into the current model.
//!
//! The legacy tool stored factors as flat "fields" with single-select
//! narratives, inconsistencies as a bare list of colliding id pairs, and a
//! project location as lat/lon plus the OSM tags captured at setup time. The
//! mapping into the current shape is irreversible: pair duplicates collapse
//! into one symmetric relation entry and raw OSM tags reduce to typed factor
//! contexts.

use std::collections::{BTreeMap, BTreeSet};

use contracts::{
    ContextType, DataModel, Factor, GeoPoint, Narrative, OptionValue, Scenario,
};
use serde::Deserialize;
use serde_json::Value;

use crate::model;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyModel {
    #[serde(default)]
    pub last_update: Option<String>,
    pub scenario: LegacyScenario,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyScenario {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<LegacyField>,
    /// Old inconsistency shape: a flat list of colliding option-id pairs.
    #[serde(default)]
    pub inconsistencies: Vec<LegacyPair>,
    #[serde(default)]
    pub narratives: Vec<LegacyNarrative>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// OSM tag strings captured by the old reverse-geocoding step.
    #[serde(default)]
    pub osm_context: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyPair(pub String, pub String);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyField {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub geographic: bool,
    #[serde(default)]
    pub options: Vec<LegacyOption>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOption {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

/// Legacy narratives were single-select per field.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyNarrative {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub selections: BTreeMap<String, String>,
}

#[derive(Debug)]
pub enum MigrationError {
    Decode(serde_json::Error),
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "stored model decode error: {err}"),
        }
    }
}

impl std::error::Error for MigrationError {}

impl From<serde_json::Error> for MigrationError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}

/// The two schema generations a stored blob can carry. The discriminant is
/// the top-level `version` field: present means current, absent means legacy.
#[derive(Debug, Clone)]
pub enum StoredModel {
    Current(DataModel),
    Legacy(LegacyModel),
}

impl StoredModel {
    pub fn from_value(value: Value) -> Result<Self, MigrationError> {
        if value.get("version").is_some() {
            Ok(Self::Current(serde_json::from_value(value)?))
        } else {
            Ok(Self::Legacy(serde_json::from_value(value)?))
        }
    }

    /// Resolve to the current shape, migrating and normalizing as needed.
    pub fn into_current(self) -> DataModel {
        match self {
            Self::Current(mut model) => {
                model::normalize(&mut model);
                model
            }
            Self::Legacy(legacy) => migrate(legacy),
        }
    }
}

/// Convert a legacy model into the current shape. Always ends with a
/// normalization pass, so missing ids are filled and the migrated relation is
/// guaranteed symmetric.
pub fn migrate(legacy: LegacyModel) -> DataModel {
    let source = legacy.scenario;
    let mut scenario = Scenario::with_id(source.id.unwrap_or_else(|| "scenario_1".to_string()));
    if let Some(title) = source.title {
        scenario.label = title;
    }
    scenario.desc = source.description;

    let resolved = resolve_contexts(&source.osm_context);
    scenario.location = match (source.lat, source.lon) {
        (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
        _ => None,
    };

    for field in source.fields {
        scenario.components.push(Factor {
            id: field.id.unwrap_or_default(),
            label: field.name,
            desc: None,
            order: None,
            manual: None,
            values: field
                .options
                .into_iter()
                .map(|option| OptionValue {
                    id: option.id.unwrap_or_default(),
                    label: option.name,
                    desc: None,
                })
                .collect(),
            contexts: if field.geographic && !resolved.is_empty() {
                Some(resolved.clone())
            } else {
                None
            },
        });
    }

    // Every legacy pair was a hard collision; duplicates and reversed
    // duplicates collapse into the one symmetric entry.
    for LegacyPair(a, b) in source.inconsistencies {
        scenario.inconsistencies.set_relation(&a, &b, Some(true));
    }

    for legacy_narrative in source.narratives {
        let mut narrative = Narrative::with_id(legacy_narrative.id.unwrap_or_default());
        if let Some(title) = legacy_narrative.title {
            narrative.label = title;
        }
        narrative.components = legacy_narrative
            .selections
            .into_iter()
            .map(|(field_id, option_id)| (field_id, vec![option_id]))
            .collect();
        narrative.saved = true;
        narrative.included = true;
        scenario.narratives.push(narrative);
    }

    let mut model = DataModel {
        last_update: legacy.last_update.unwrap_or_default(),
        scenario,
        ..DataModel::default()
    };
    model::normalize(&mut model);
    model
}

/// Reduce raw OSM tag strings to the typed contexts the current model knows.
/// Unknown tags are ignored; any recognized geography also anchors the
/// generic location context.
pub fn resolve_contexts(osm_tags: &[String]) -> Vec<ContextType> {
    let mut resolved: BTreeSet<ContextType> = BTreeSet::new();

    for tag in osm_tags {
        let context = match tag.as_str() {
            "city" | "town" | "village" | "suburb" | "hamlet" => Some(ContextType::Population),
            "industrial" | "motorway" | "railway" | "power" | "harbour" | "port" => {
                Some(ContextType::Infrastructure)
            }
            "coastline" | "river" | "stream" | "water" | "wetland" | "floodplain" => {
                Some(ContextType::Hazard)
            }
            "peak" | "ridge" | "glacier" => Some(ContextType::Weather),
            _ => None,
        };
        if let Some(context) = context {
            resolved.insert(context);
            resolved.insert(ContextType::Location);
        }
    }

    resolved.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy_value() -> Value {
        json!({
            "lastUpdate": "1600000000",
            "scenario": {
                "title": "Flood response",
                "lat": 53.55,
                "lon": 9.99,
                "osmContext": ["city", "river", "unmapped_tag"],
                "fields": [
                    {
                        "name": "Severity",
                        "geographic": true,
                        "options": [
                            {"id": "sev_low", "name": "Low"},
                            {"id": "sev_high", "name": "High"}
                        ]
                    },
                    {
                        "id": "response",
                        "name": "Response",
                        "options": [
                            {"id": "evacuate", "name": "Evacuate"},
                            {"id": "shelter", "name": "Shelter in place"}
                        ]
                    }
                ],
                "inconsistencies": [
                    ["sev_low", "evacuate"],
                    ["evacuate", "sev_low"]
                ],
                "narratives": [
                    {
                        "title": "Worst case",
                        "selections": {"response": "evacuate"}
                    }
                ]
            }
        })
    }

    #[test]
    fn version_field_discriminates_the_schema() {
        let current = json!({"version": 2, "scenario": {"id": "s", "label": "S"}});
        assert!(matches!(
            StoredModel::from_value(current).unwrap(),
            StoredModel::Current(_)
        ));
        assert!(matches!(
            StoredModel::from_value(legacy_value()).unwrap(),
            StoredModel::Legacy(_)
        ));
    }

    #[test]
    fn legacy_pairs_become_symmetric_hard_exclusions() {
        let model = StoredModel::from_value(legacy_value()).unwrap().into_current();
        let relation = &model.scenario.inconsistencies;

        assert!(relation.is_excluded("sev_low", "evacuate"));
        assert!(relation.is_excluded("evacuate", "sev_low"));
        assert!(relation.is_symmetric());
        // The reversed duplicate collapsed into one pair.
        assert_eq!(relation.link_count("sev_low"), 1);
    }

    #[test]
    fn geographic_fields_get_resolved_contexts() {
        let model = StoredModel::from_value(legacy_value()).unwrap().into_current();
        let scenario = &model.scenario;

        let severity = scenario
            .components
            .iter()
            .find(|f| f.label == "Severity")
            .unwrap();
        let contexts = severity.contexts.as_deref().unwrap();
        assert!(contexts.contains(&ContextType::Location));
        assert!(contexts.contains(&ContextType::Population));
        assert!(contexts.contains(&ContextType::Hazard));

        let response = scenario.factor("response").unwrap();
        assert!(response.contexts.is_none());

        let location = scenario.location.unwrap();
        assert!((location.lat - 53.55).abs() < f64::EPSILON);
    }

    #[test]
    fn single_select_narratives_become_lists() {
        let model = StoredModel::from_value(legacy_value()).unwrap().into_current();
        let narrative = &model.scenario.narratives[0];

        assert_eq!(narrative.label, "Worst case");
        assert_eq!(narrative.components["response"], vec!["evacuate".to_string()]);
        assert!(narrative.saved);
        assert!(narrative.included);
    }

    #[test]
    fn migration_fills_missing_ids_and_stamps_version() {
        let model = StoredModel::from_value(legacy_value()).unwrap().into_current();

        assert_eq!(model.version, contracts::MODEL_VERSION);
        assert_eq!(model.last_update, "1600000000");
        for factor in &model.scenario.components {
            assert!(!factor.id.is_empty());
        }
    }

    #[test]
    fn unknown_tags_resolve_to_nothing() {
        assert!(resolve_contexts(&["meadow".to_string()]).is_empty());
        assert!(resolve_contexts(&[]).is_empty());
    }
}
