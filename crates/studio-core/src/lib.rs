//! Pure algorithms of the morphological-box kernel: constrained random
//! scenario generation, narrative validation, decision-support aggregation,
//! the risk matrix, model normalization, and legacy migration.
//!
//! Everything here is synchronous, I/O-free, and deterministic given a seed;
//! the surrounding application owns persistence and transport.

pub mod decision;
pub mod generator;
pub mod migration;
pub mod model;
pub mod prompt;
pub mod risk;
pub mod validator;

pub use decision::{
    aggregate, aggregate_with_tallies, select_included, DecisionBreakdown, SUGGESTED_APPROACH_ID,
};
pub use generator::{allowed_options, generate, generate_with_rng, GeneratorConfig};
pub use migration::{migrate, StoredModel};
pub use model::{color_for_count, normalize, normalize_scenario, option_usage, NormalizeReport};
pub use prompt::render_prompt;
pub use risk::{compute_risk, RiskError};
pub use validator::validate;
