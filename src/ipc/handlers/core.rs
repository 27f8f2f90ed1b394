use std::path::PathBuf;

use serde_json::json;
use tracing::{info, warn};

use crate::dataset::Dataset;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "dataPath": state.data_path.to_string_lossy(),
            "datasetLoaded": state.dataset.is_some(),
        }),
    )
}

fn dataset_summary(dataset: &Dataset, already_loaded: bool) -> serde_json::Value {
    let span = dataset.date_span();
    json!({
        "source": dataset.source().to_string_lossy(),
        "rows": dataset.len(),
        "dateStart": span.map(|(start, _)| start),
        "dateEnd": span.map(|(_, end)| end),
        "alreadyLoaded": already_loaded,
    })
}

fn handle_dataset_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    // The snapshot is cached for the process lifetime; there is no
    // invalidation trigger, so a repeat load answers from the cache.
    if let Some(dataset) = &state.dataset {
        return ok(&req.id, dataset_summary(dataset, true));
    }

    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.data_path.clone());

    match Dataset::load(&path) {
        Ok(dataset) => {
            info!(path = %path.display(), rows = dataset.len(), "class snapshot loaded");
            let summary = dataset_summary(&dataset, false);
            state.dataset = Some(dataset);
            ok(&req.id, summary)
        }
        Err(e) => {
            warn!(path = %path.display(), "class snapshot load failed: {e:#}");
            err(&req.id, "load_failed", format!("{e:#}"), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "dataset.load" => Some(handle_dataset_load(state, req)),
        _ => None,
    }
}
