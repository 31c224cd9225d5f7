//! Symmetric pairwise consistency relation between option ids.
//!
//! Semantics per pair: key absent = possible, `true` = impossible (hard
//! exclusion, enforced during generation), `false` = improbable (advisory
//! only, used by UI filtering). Both directions of a pair are written and
//! removed together, so `R[a][b] == R[b][a]` holds after every mutation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The wire format is the nested map `{ optionId: { optionId: bool } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConsistencyRelation {
    entries: BTreeMap<String, BTreeMap<String, bool>>,
}

impl ConsistencyRelation {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored value for the pair, in either direction.
    pub fn relation(&self, a: &str, b: &str) -> Option<bool> {
        self.entries.get(a).and_then(|row| row.get(b)).copied()
    }

    /// True iff the pair is marked impossible. Absent and "improbable" both
    /// count as allowed; generation enforces only hard exclusions.
    pub fn is_excluded(&self, a: &str, b: &str) -> bool {
        self.relation(a, b) == Some(true)
    }

    /// True iff the pair is marked improbable (the soft, advisory value).
    pub fn is_improbable(&self, a: &str, b: &str) -> bool {
        self.relation(a, b) == Some(false)
    }

    /// Set both directions of the pair atomically. `None` deletes the pair
    /// (reverts to "possible"). Self-relations are meaningless and rejected;
    /// the return value reports whether anything was written.
    pub fn set_relation(&mut self, a: &str, b: &str, value: Option<bool>) -> bool {
        if a == b {
            return false;
        }

        match value {
            Some(flag) => {
                self.entries
                    .entry(a.to_string())
                    .or_default()
                    .insert(b.to_string(), flag);
                self.entries
                    .entry(b.to_string())
                    .or_default()
                    .insert(a.to_string(), flag);
            }
            None => {
                self.remove_directed(a, b);
                self.remove_directed(b, a);
            }
        }

        debug_assert!(self.is_symmetric());
        true
    }

    /// Number of relation entries the option participates in, hard and soft
    /// alike. This is the raw link count behind the generator's
    /// most-constrained-first ordering.
    pub fn link_count(&self, option_id: &str) -> usize {
        self.entries.get(option_id).map_or(0, BTreeMap::len)
    }

    /// Option ids the given option is hard-excluded against.
    pub fn hard_partners(&self, option_id: &str) -> impl Iterator<Item = &str> {
        self.entries
            .get(option_id)
            .into_iter()
            .flat_map(|row| row.iter())
            .filter(|(_, excluded)| **excluded)
            .map(|(partner, _)| partner.as_str())
    }

    /// Drop every entry that touches an option id not accepted by `keep`.
    /// Used when options are deleted from the model.
    pub fn retain_options(&mut self, keep: impl Fn(&str) -> bool) {
        self.entries.retain(|option_id, _| keep(option_id));
        for row in self.entries.values_mut() {
            row.retain(|partner, _| keep(partner));
        }
        self.entries.retain(|_, row| !row.is_empty());
    }

    /// Re-establish symmetry after deserializing an externally produced blob.
    /// On conflict the entry under the lexicographically smaller option id
    /// wins. Returns the number of directed cells added or corrected.
    pub fn heal_symmetry(&mut self) -> usize {
        let mut canonical: BTreeMap<(String, String), bool> = BTreeMap::new();
        for (a, row) in &self.entries {
            for (b, flag) in row {
                let key = if a < b {
                    (a.clone(), b.clone())
                } else {
                    (b.clone(), a.clone())
                };
                if *a < *b {
                    canonical.insert(key, *flag);
                } else {
                    canonical.entry(key).or_insert(*flag);
                }
            }
        }

        let mut rebuilt = ConsistencyRelation::new();
        for ((a, b), flag) in &canonical {
            rebuilt.set_relation(a, b, Some(*flag));
        }

        let healed = rebuilt
            .entries
            .iter()
            .flat_map(|(a, row)| row.iter().map(move |(b, flag)| (a, b, *flag)))
            .filter(|(a, b, flag)| self.relation(a, b) != Some(*flag))
            .count();
        self.entries = rebuilt.entries;
        healed
    }

    pub fn is_symmetric(&self) -> bool {
        self.entries.iter().all(|(a, row)| {
            row.iter()
                .all(|(b, flag)| self.relation(b, a) == Some(*flag))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_directed(&mut self, from: &str, to: &str) {
        if let Some(row) = self.entries.get_mut(from) {
            row.remove(to);
            if row.is_empty() {
                self.entries.remove(from);
            }
        }
    }
}
