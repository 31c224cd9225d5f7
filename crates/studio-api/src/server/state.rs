#[derive(Clone)]
struct AppState {
    inner: std::sync::Arc<Mutex<ServerInner>>,
    /// The text-generation collaborator is read-only; it lives outside the
    /// model mutex so slow HTTP calls never hold up model access.
    textgen: Option<HttpTextGenerator>,
}

impl AppState {
    fn new(api: StudioApi, textgen: Option<HttpTextGenerator>) -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(ServerInner { api })),
            textgen,
        }
    }
}

struct ServerInner {
    api: StudioApi,
}

fn persistence_warning(api: &StudioApi) -> Option<String> {
    api.last_persistence_error().map(str::to_string)
}
