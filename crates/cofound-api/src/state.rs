use std::sync::Arc;

use cofound_matching::Matchmaker;

use crate::middleware::TokenVerifier;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub matchmaker: Matchmaker,
    pub verifier: TokenVerifier,
    /// Reported by the health check.
    pub environment: String,
}
