use std::sync::Arc;

use crate::client_key::KeyStrategy;
use crate::provider::ContentProvider;
use crate::rate_limit::AdmissionGate;

// app's shared state
pub struct AppState {
    pub gate: AdmissionGate,
    pub key_strategy: Box<dyn KeyStrategy>,
    pub provider: ContentProvider,
    pub generate_limit: u32, // admissions per window for the generation endpoint
}

pub type SharedState = Arc<AppState>;
