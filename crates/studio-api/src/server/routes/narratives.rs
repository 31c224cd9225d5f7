#[derive(Debug, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    locked: BTreeMap<String, Vec<String>>,
    count: Option<usize>,
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    narratives: Vec<Narrative>,
    exhausted: usize,
    requested: usize,
}

fn sanitize_count(requested: Option<usize>) -> Result<usize, HttpApiError> {
    let count = requested.unwrap_or(1);
    if count == 0 {
        return Err(HttpApiError::invalid_query(
            "count must be >= 1",
            Some("count=0".to_string()),
        ));
    }
    if count > MAX_BATCH_SIZE {
        return Err(HttpApiError::invalid_query(
            "count exceeds the batch limit",
            Some(format!("count={count} max={MAX_BATCH_SIZE}")),
        ));
    }
    Ok(count)
}

async fn generate_narratives(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, HttpApiError> {
    let count = sanitize_count(request.count)?;

    let inner = state.inner.lock().await;
    let batch = inner.api.generate_batch(&request.locked, count, request.seed);

    if batch.narratives.is_empty() {
        return Err(HttpApiError::generation_exhausted(count));
    }

    Ok(Json(GenerateResponse {
        narratives: batch.narratives,
        exhausted: batch.exhausted,
        requested: count,
    }))
}

#[derive(Debug, Serialize)]
struct SaveNarrativeResponse {
    narrative: Narrative,
    persistence_warning: Option<String>,
}

async fn save_narrative(
    State(state): State<AppState>,
    Json(narrative): Json<Narrative>,
) -> Result<Json<SaveNarrativeResponse>, HttpApiError> {
    if narrative.id.is_empty() {
        return Err(HttpApiError::invalid_command(
            "narrative id must not be empty",
            None,
        ));
    }

    let mut inner = state.inner.lock().await;
    let narrative = inner.api.save_narrative(narrative);

    Ok(Json(SaveNarrativeResponse {
        narrative,
        persistence_warning: persistence_warning(&inner.api),
    }))
}

#[derive(Debug, Serialize)]
struct DeleteNarrativeResponse {
    narrative_id: String,
    persistence_warning: Option<String>,
}

async fn delete_narrative(
    Path(narrative_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeleteNarrativeResponse>, HttpApiError> {
    let mut inner = state.inner.lock().await;
    if !inner.api.delete_narrative(&narrative_id) {
        return Err(HttpApiError::narrative_not_found(&narrative_id));
    }

    Ok(Json(DeleteNarrativeResponse {
        narrative_id,
        persistence_warning: persistence_warning(&inner.api),
    }))
}

#[derive(Debug, Serialize)]
struct ElaborateResponse {
    narrative_id: String,
    prompt: String,
    title: Option<String>,
    content: String,
}

async fn elaborate_narrative(
    Path(narrative_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ElaborateResponse>, HttpApiError> {
    let Some(textgen) = state.textgen.as_ref() else {
        return Err(HttpApiError::invalid_query(
            "no text-generation endpoint is configured",
            None,
        ));
    };

    // Render under the lock, call the collaborator outside it.
    let prompt = {
        let inner = state.inner.lock().await;
        let scenario = inner.api.scenario();
        let Some(narrative) = scenario.narrative(&narrative_id) else {
            return Err(HttpApiError::narrative_not_found(&narrative_id));
        };
        studio_core::render_prompt(scenario, narrative)
    };

    let text = textgen
        .generate_text(&prompt)
        .await
        .map_err(|err| HttpApiError::text_generation_failed(err.to_string()))?;

    Ok(Json(ElaborateResponse {
        narrative_id,
        prompt,
        title: text.title,
        content: text.content,
    }))
}
