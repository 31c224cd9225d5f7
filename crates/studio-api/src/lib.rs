//! In-process API facade owning the current data model, with JSON blob
//! persistence and the HTTP surface on top.
//!
//! Every mutating operation re-stamps `lastUpdate` and writes the whole blob
//! back through the attached store; persistence failures are recorded and
//! reported, never fatal to the in-memory model.

mod persistence;
mod server;
mod textgen;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use contracts::{DataModel, Narrative, Scenario};
use rand::Rng;
use studio_core::{decision, generator, migration, model as invariants, risk, validator};
use studio_core::{DecisionBreakdown, GeneratorConfig, NormalizeReport};

pub use persistence::{PersistenceError, SqliteModelStore};
pub use server::{serve, ServeOptions, ServerError};
pub use textgen::{GeneratedText, HttpTextGenerator, TextGenError, TextGenerator};

/// Result of an auto-generate call: the narratives that came out plus how
/// many attempts exhausted their retry budget.
#[derive(Debug, Clone, Default)]
pub struct GenerateBatch {
    pub narratives: Vec<Narrative>,
    pub exhausted: usize,
}

#[derive(Debug)]
pub struct StudioApi {
    model: DataModel,
    store: Option<SqliteModelStore>,
    last_persistence_error: Option<String>,
}

impl StudioApi {
    pub fn new() -> Self {
        Self::from_model(DataModel::default())
    }

    /// Adopt a model, enforcing the load invariants first.
    pub fn from_model(mut model: DataModel) -> Self {
        invariants::normalize(&mut model);
        Self {
            model,
            store: None,
            last_persistence_error: None,
        }
    }

    pub fn attach_sqlite_store(&mut self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        self.store = Some(SqliteModelStore::open(path)?);
        Ok(())
    }

    /// Pull the persisted blob into memory, migrating legacy shapes
    /// transparently. Returns `false` when the store holds nothing yet.
    pub fn load_from_store(&mut self) -> Result<bool, PersistenceError> {
        let Some(store) = self.store.as_ref() else {
            return Err(PersistenceError::NotAttached);
        };

        let Some(value) = store.load_value()? else {
            return Ok(false);
        };
        let stored = migration::StoredModel::from_value(value)
            .map_err(|err| match err {
                migration::MigrationError::Decode(inner) => PersistenceError::Serde(inner),
            })?;
        self.model = stored.into_current();
        self.last_persistence_error = None;
        Ok(true)
    }

    pub fn model(&self) -> &DataModel {
        &self.model
    }

    pub fn scenario(&self) -> &Scenario {
        &self.model.scenario
    }

    /// Replace the whole model. The report says what normalization healed.
    pub fn replace_model(&mut self, model: DataModel) -> NormalizeReport {
        self.model = model;
        let report = invariants::normalize(&mut self.model);
        self.persist_if_attached();
        report
    }

    /// Generate one narrative honoring the locked selections. `None` means
    /// the retry budget ran out without a consistent assignment.
    pub fn generate(&self, locked: &BTreeMap<String, Vec<String>>) -> Option<Narrative> {
        self.generate_seeded(locked, rand::rng().random())
    }

    pub fn generate_seeded(
        &self,
        locked: &BTreeMap<String, Vec<String>>,
        seed: u64,
    ) -> Option<Narrative> {
        generator::generate(&self.model.scenario, locked, seed)
    }

    /// Auto-generate up to `count` narratives. Exhausted attempts are counted
    /// rather than aborting the batch, so one over-constrained lock set still
    /// yields whatever it can.
    pub fn generate_batch(
        &self,
        locked: &BTreeMap<String, Vec<String>>,
        count: usize,
        seed: Option<u64>,
    ) -> GenerateBatch {
        let mut rng: rand::rngs::StdRng = match seed {
            Some(seed) => rand::SeedableRng::seed_from_u64(seed),
            None => rand::SeedableRng::seed_from_u64(rand::rng().random()),
        };
        let config = GeneratorConfig::default();

        let mut batch = GenerateBatch::default();
        for _ in 0..count {
            match generator::generate_with_rng(&self.model.scenario, locked, &mut rng, &config) {
                Some(narrative) => batch.narratives.push(narrative),
                None => batch.exhausted += 1,
            }
        }
        batch
    }

    /// Commit a narrative to the model's pool: validated against the current
    /// factors, risk recomputed from probability × impact when both are set,
    /// then appended or replaced by id. Returns the narrative as stored.
    pub fn save_narrative(&mut self, narrative: Narrative) -> Narrative {
        let mut saved = validator::validate(&narrative, &self.model.scenario.components);
        saved.saved = true;
        if let Ok(Some(risk_id)) = risk::derived_risk(&saved) {
            saved.risk = Some(risk_id);
        }

        let narratives = &mut self.model.scenario.narratives;
        match narratives.iter_mut().find(|existing| existing.id == saved.id) {
            Some(slot) => *slot = saved.clone(),
            None => narratives.push(saved.clone()),
        }

        self.persist_if_attached();
        saved
    }

    pub fn delete_narrative(&mut self, narrative_id: &str) -> bool {
        let narratives = &mut self.model.scenario.narratives;
        let before = narratives.len();
        narratives.retain(|narrative| narrative.id != narrative_id);
        let removed = narratives.len() != before;
        if removed {
            self.persist_if_attached();
        }
        removed
    }

    /// Mutate the pairwise relation; both directions are written together.
    /// Returns `false` for the rejected self-relation case.
    pub fn set_relation(&mut self, a: &str, b: &str, value: Option<bool>) -> bool {
        let changed = self
            .model
            .scenario
            .inconsistencies
            .set_relation(a, b, value);
        if changed {
            self.persist_if_attached();
        }
        changed
    }

    pub fn is_excluded(&self, a: &str, b: &str) -> bool {
        self.model.scenario.inconsistencies.is_excluded(a, b)
    }

    /// The weighted-plurality recommendation over the included narratives.
    pub fn decision_support(&self) -> DecisionBreakdown {
        let selected = decision::select_included(&self.model.scenario.narratives);
        decision::aggregate_with_tallies(&selected, &self.model.scenario.components)
    }

    /// Swap the active scenario with a saved alternate. The current scenario
    /// takes the alternate's slot, so switching back loses nothing.
    pub fn activate_scenario(&mut self, scenario_id: &str) -> bool {
        let Some(index) = self
            .model
            .scenarios
            .iter()
            .position(|scenario| scenario.id == scenario_id)
        else {
            return false;
        };

        std::mem::swap(&mut self.model.scenario, &mut self.model.scenarios[index]);
        self.persist_if_attached();
        true
    }

    pub fn last_persistence_error(&self) -> Option<&str> {
        self.last_persistence_error.as_deref()
    }

    fn persist_if_attached(&mut self) {
        self.model.last_update = timestamp();
        let Some(store) = self.store.as_mut() else {
            return;
        };

        match store.save(&self.model) {
            Ok(()) => self.last_persistence_error = None,
            Err(err) => self.last_persistence_error = Some(err.to_string()),
        }
    }
}

impl Default for StudioApi {
    fn default() -> Self {
        Self::new()
    }
}

fn timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs().to_string())
        .unwrap_or_default()
}
