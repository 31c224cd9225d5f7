use super::*;

#[test]
fn sanitize_count_enforces_bounds() {
    assert_eq!(sanitize_count(None).unwrap(), 1);
    assert_eq!(sanitize_count(Some(5)).unwrap(), 5);
    assert_eq!(sanitize_count(Some(MAX_BATCH_SIZE)).unwrap(), MAX_BATCH_SIZE);

    assert!(sanitize_count(Some(0)).is_err());
    assert!(sanitize_count(Some(MAX_BATCH_SIZE + 1)).is_err());
}

#[test]
fn router_builds_with_empty_state() {
    let state = AppState::new(StudioApi::new(), None);
    let _ = router(state);
}

#[test]
fn invalid_risk_maps_to_bad_request() {
    let err = HttpApiError::invalid_risk(studio_core::RiskError::OutOfRange {
        probability: 9,
        impact: 0,
    });
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.error.error_code, ErrorCode::InvalidRiskInput);
}

#[test]
fn default_sqlite_path_is_never_empty() {
    assert!(!default_sqlite_path().trim().is_empty());
}
