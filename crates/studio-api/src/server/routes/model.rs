#[derive(Debug, Serialize)]
struct PutModelResponse {
    defaulted_ids: usize,
    defaulted_labels: usize,
    dropped_option_refs: usize,
    healed_relation_entries: usize,
    persistence_warning: Option<String>,
}

async fn get_model(State(state): State<AppState>) -> Json<DataModel> {
    let inner = state.inner.lock().await;
    Json(inner.api.model().clone())
}

async fn put_model(
    State(state): State<AppState>,
    Json(model): Json<DataModel>,
) -> Json<PutModelResponse> {
    let mut inner = state.inner.lock().await;
    let report = inner.api.replace_model(model);

    Json(PutModelResponse {
        defaulted_ids: report.defaulted_ids,
        defaulted_labels: report.defaulted_labels,
        dropped_option_refs: report.dropped_option_refs,
        healed_relation_entries: report.healed_relation_entries,
        persistence_warning: persistence_warning(&inner.api),
    })
}

#[derive(Debug, Deserialize)]
struct RelationRequest {
    a: String,
    b: String,
    /// `true` = impossible, `false` = improbable, absent = delete the pair.
    value: Option<bool>,
}

#[derive(Debug, Serialize)]
struct RelationResponse {
    a: String,
    b: String,
    value: Option<bool>,
    persistence_warning: Option<String>,
}

async fn put_relation(
    State(state): State<AppState>,
    Json(request): Json<RelationRequest>,
) -> Result<Json<RelationResponse>, HttpApiError> {
    if request.a == request.b {
        return Err(HttpApiError::invalid_command(
            "a self-relation is meaningless",
            Some(format!("a={} b={}", request.a, request.b)),
        ));
    }

    let mut inner = state.inner.lock().await;
    inner.api.set_relation(&request.a, &request.b, request.value);

    Ok(Json(RelationResponse {
        a: request.a,
        b: request.b,
        value: request.value,
        persistence_warning: persistence_warning(&inner.api),
    }))
}
