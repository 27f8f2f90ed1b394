use std::path::PathBuf;

use serde::Deserialize;

use crate::dataset::Dataset;
use crate::session::{self, PasscodeDigest, SessionState};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    /// Default snapshot path from the CLI; `dataset.load` may override it.
    pub data_path: PathBuf,
    /// Loaded once, then held for the rest of the run.
    pub dataset: Option<Dataset>,
    pub session: SessionState,
    pub passcode: PasscodeDigest,
}

impl AppState {
    pub fn new(data_path: PathBuf) -> AppState {
        AppState {
            data_path,
            dataset: None,
            session: SessionState::default(),
            passcode: session::resolve_passcode(),
        }
    }
}
