//! Fixed probability × impact risk matrix on 0–4 ordinal scales.

use std::fmt;

use contracts::Narrative;

/// Row = probability, column = impact. The table is fixed product behavior,
/// not a formula; change it only together with the UI legend.
pub const RISK_MATRIX: [[u8; 5]; 5] = [
    [0, 0, 1, 2, 3],
    [0, 1, 2, 3, 4],
    [1, 2, 3, 4, 4],
    [2, 3, 4, 4, 4],
    [3, 4, 4, 4, 4],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskError {
    OutOfRange { probability: u8, impact: u8 },
    MalformedId { id: String, expected_prefix: String },
}

impl fmt::Display for RiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                probability,
                impact,
            } => write!(
                f,
                "risk ordinals out of range: probability={probability} impact={impact} (expected 0..=4)"
            ),
            Self::MalformedId {
                id,
                expected_prefix,
            } => write!(f, "malformed ordinal id {id:?} (expected {expected_prefix}_<0..4>)"),
        }
    }
}

impl std::error::Error for RiskError {}

/// Look up the risk ordinal for a probability/impact pair. Inputs outside
/// `[0, 4]` are a caller error, not a clamped value.
pub fn compute_risk(probability: u8, impact: u8) -> Result<u8, RiskError> {
    if probability > 4 || impact > 4 {
        return Err(RiskError::OutOfRange {
            probability,
            impact,
        });
    }
    Ok(RISK_MATRIX[probability as usize][impact as usize])
}

/// Parse the trailing ordinal from an id of the form `<prefix>_<0..4>`.
pub fn parse_ordinal(id: &str, prefix: &str) -> Result<u8, RiskError> {
    let malformed = || RiskError::MalformedId {
        id: id.to_string(),
        expected_prefix: prefix.to_string(),
    };

    let rest = id
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .ok_or_else(malformed)?;
    let ordinal = rest.parse::<u8>().map_err(|_| malformed())?;
    if ordinal > 4 {
        return Err(malformed());
    }
    Ok(ordinal)
}

pub fn risk_id(ordinal: u8) -> String {
    format!("risk_{ordinal}")
}

/// Recompute a narrative's `risk` id from its probability and impact ids.
/// Returns `Ok(None)` when either input is unset; malformed ids are an error
/// the caller must have validated away upstream.
pub fn derived_risk(narrative: &Narrative) -> Result<Option<String>, RiskError> {
    let (Some(probability_id), Some(impact_id)) =
        (narrative.probability.as_deref(), narrative.impact.as_deref())
    else {
        return Ok(None);
    };

    let probability = parse_ordinal(probability_id, "probability")?;
    let impact = parse_ordinal(impact_id, "impact")?;
    Ok(Some(risk_id(compute_risk(probability, impact)?)))
}
