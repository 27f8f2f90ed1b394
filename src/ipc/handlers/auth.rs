use serde_json::json;
use tracing::{info, warn};

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::session;

fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let passcode = match required_str(req, "passcode") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if state.session.login(&state.passcode, &passcode) {
        info!("session authenticated");
        ok(&req.id, json!({ "authenticated": true }))
    } else {
        warn!("login attempt rejected");
        err(
            &req.id,
            "incorrect_passcode",
            session::INCORRECT_PASSCODE,
            None,
        )
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.session.logout();
    info!("session cleared");
    ok(&req.id, json!({ "authenticated": false }))
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    match serde_json::to_value(&state.session) {
        Ok(session) => ok(&req.id, session),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.status" => Some(handle_status(state, req)),
        _ => None,
    }
}
