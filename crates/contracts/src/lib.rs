//! Cross-boundary contracts for the morphological-box kernel, API, and persistence.
//!
//! Field names follow the persisted JSON layout (camelCase), so every type here
//! round-trips through the blob store and the HTTP surface without adapters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod relation;

pub use relation::ConsistencyRelation;

/// Current version tag of the persisted [`DataModel`] envelope. Stored blobs
/// without a `version` field are treated as legacy and must be migrated.
pub const MODEL_VERSION: u32 = 2;

/// One possible value of a factor. Identity is immutable; label and
/// description may be edited freely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OptionValue {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

/// Kinds of contextual data a factor can be fed from. Produced today only by
/// the legacy migration's OSM tag resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    Location,
    Weather,
    Population,
    Infrastructure,
    Hazard,
}

/// An independent dimension of a scenario (a "key driver") with a discrete
/// set of option values.
///
/// `manual = true` means generation never auto-selects a value; the user must
/// lock one explicitly. `order` is the display/processing priority used to
/// break ties when factors are equally constrained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Factor {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<bool>,
    #[serde(default)]
    pub values: Vec<OptionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<ContextType>>,
}

impl Factor {
    pub fn is_manual(&self) -> bool {
        self.manual.unwrap_or(false)
    }

    pub fn option(&self, option_id: &str) -> Option<&OptionValue> {
        self.values.iter().find(|value| value.id == option_id)
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.option(option_id).is_some()
    }
}

/// A non-exclusive grouping of factors. Holds factor ids, not ownership;
/// dangling ids are tolerated and skipped by consumers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_support: Option<bool>,
    #[serde(default)]
    pub component_ids: Vec<String>,
}

impl Category {
    pub fn is_decision_support(&self) -> bool {
        self.decision_support.unwrap_or(false)
    }
}

/// One concrete scenario: a selection of option ids per factor, plus optional
/// risk bookkeeping and inclusion/saved flags.
///
/// `components` maps factor id to the list of chosen option ids (multi-select
/// is allowed). `saved = false` marks a scratch narrative not yet committed to
/// the model's narrative list; `included = true` marks it for decision support.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default)]
    pub components: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub included: bool,
    #[serde(default)]
    pub saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_effects: Option<Value>,
}

impl Narrative {
    /// A minimal narrative with the given id; label defaults to the id.
    pub fn with_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            desc: None,
            components: BTreeMap::new(),
            included: false,
            saved: false,
            risk: None,
            probability: None,
            impact: None,
            persona_effects: None,
        }
    }

    /// All option ids selected anywhere in this narrative.
    pub fn selected_option_ids(&self) -> impl Iterator<Item = &str> {
        self.components
            .values()
            .flat_map(|ids| ids.iter().map(String::as_str))
    }
}

/// Presentation threshold: the color applies to usage counts at or above
/// `threshold`, up to the next higher threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdColor {
    pub threshold: u64,
    pub color: String,
}

/// Geographic anchor carried over from legacy models for the map seam.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// The factor-model root: factors, categories, the pairwise consistency
/// relation, and the pool of saved narratives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<Value>,
    #[serde(default)]
    pub hide_inconsistent_values: bool,
    #[serde(default)]
    pub include_decision_support: bool,
    #[serde(default)]
    pub inconsistencies: ConsistencyRelation,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub components: Vec<Factor>,
    #[serde(default)]
    pub narratives: Vec<Narrative>,
    #[serde(default)]
    pub threshold_colors: Vec<ThresholdColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

impl Scenario {
    pub fn with_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            desc: None,
            template: None,
            llm: None,
            hide_inconsistent_values: false,
            include_decision_support: false,
            inconsistencies: ConsistencyRelation::default(),
            categories: Vec::new(),
            components: Vec::new(),
            narratives: Vec::new(),
            threshold_colors: Vec::new(),
            location: None,
        }
    }

    pub fn factor(&self, factor_id: &str) -> Option<&Factor> {
        self.components.iter().find(|factor| factor.id == factor_id)
    }

    pub fn narrative(&self, narrative_id: &str) -> Option<&Narrative> {
        self.narratives
            .iter()
            .find(|narrative| narrative.id == narrative_id)
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::with_id("scenario_1")
    }
}

/// Persisted envelope: the active scenario, alternate saved scenarios, and
/// opaque persona data the core carries through without interpreting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataModel {
    pub version: u32,
    #[serde(default)]
    pub last_update: String,
    pub scenario: Scenario,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personas: Option<Value>,
}

impl Default for DataModel {
    fn default() -> Self {
        Self {
            version: MODEL_VERSION,
            last_update: String::new(),
            scenario: Scenario::default(),
            scenarios: Vec::new(),
            personas: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ModelNotLoaded,
    InvalidQuery,
    InvalidCommand,
    NarrativeNotFound,
    ScenarioNotFound,
    GenerationExhausted,
    InvalidRiskInput,
    TextGenerationFailed,
    InternalError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiError {
    pub error_code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(error_code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
            details,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{:?}: {} ({details})", self.error_code, self.message),
            None => write!(f, "{:?}: {}", self.error_code, self.message),
        }
    }
}
