use thiserror::Error;

/// Error type for every fallible workflow operation.
///
/// Step-stage variants keep the retry logs readable: a failed attempt names
/// the stage that broke, not just the underlying CDP call.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("failed to open category: {0}")]
    Category(String),
    #[error("failed to add item to cart: {0}")]
    AddItem(String),
    #[error("failed to navigate to cart: {0}")]
    CartNavigation(String),
    #[error("failed to open promo box after {attempts} attempts")]
    PromoBox { attempts: usize },
    #[error("promo box still collapsed")]
    PromoBoxCollapsed,
    #[error("failed to submit promo code: {0}")]
    PromoSubmission(String),
    #[error("element not found: {0}")]
    ElementMissing(&'static str),
    #[error("no candidates to sample: {0}")]
    EmptyCandidates(String),
    #[error("timed out waiting for {0}")]
    ResponseTimeout(String),
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("browser session error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("payload error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
