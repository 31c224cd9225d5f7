#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
    Persistence(PersistenceError),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "server io error: {err}"),
            Self::Persistence(err) => write!(f, "server persistence error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<PersistenceError> for ServerError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn invalid_query(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidQuery, message, details),
        }
    }

    fn invalid_command(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidCommand, message, details),
        }
    }

    fn narrative_not_found(narrative_id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: ApiError::new(
                ErrorCode::NarrativeNotFound,
                "no saved narrative with that id",
                Some(format!("narrative_id={narrative_id}")),
            ),
        }
    }

    fn generation_exhausted(requested: usize) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            error: ApiError::new(
                ErrorCode::GenerationExhausted,
                "no consistent scenario could be generated; unlock factors and retry",
                Some(format!("requested={requested}")),
            ),
        }
    }

    fn invalid_risk(err: studio_core::RiskError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(
                ErrorCode::InvalidRiskInput,
                "probability and impact must be ordinals in [0, 4]",
                Some(err.to_string()),
            ),
        }
    }

    fn text_generation_failed(details: String) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            error: ApiError::new(
                ErrorCode::TextGenerationFailed,
                "text generation collaborator failed",
                Some(details),
            ),
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}
