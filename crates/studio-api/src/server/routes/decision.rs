#[derive(Debug, Serialize)]
struct DecisionResponse {
    suggested: Narrative,
    tallies: BTreeMap<String, BTreeMap<String, u64>>,
}

async fn get_decision(State(state): State<AppState>) -> Json<DecisionResponse> {
    let inner = state.inner.lock().await;
    let breakdown = inner.api.decision_support();

    Json(DecisionResponse {
        suggested: breakdown.suggested,
        tallies: breakdown.tallies,
    })
}

#[derive(Debug, Deserialize)]
struct RiskQuery {
    probability: u8,
    impact: u8,
}

#[derive(Debug, Serialize)]
struct RiskResponse {
    probability: u8,
    impact: u8,
    risk: u8,
    risk_id: String,
}

async fn get_risk(Query(query): Query<RiskQuery>) -> Result<Json<RiskResponse>, HttpApiError> {
    let risk = studio_core::compute_risk(query.probability, query.impact)
        .map_err(HttpApiError::invalid_risk)?;

    Ok(Json(RiskResponse {
        probability: query.probability,
        impact: query.impact,
        risk,
        risk_id: studio_core::risk::risk_id(risk),
    }))
}
