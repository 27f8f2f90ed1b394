use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::calc::Selection;

/// Environment variable the expected passcode is read from.
pub const PASSCODE_ENV: &str = "STUDIO_PASSCODE";

/// The passcode the hosted dashboard shipped with when nothing is
/// configured. Running on it is a known weakness; `resolve_passcode`
/// callers warn when this is in effect.
const FALLBACK_PASSCODE: &str = "areve2024";

pub const INCORRECT_PASSCODE: &str = "incorrect passcode";

/// SHA-256 digest of the expected passcode. The plaintext secret is never
/// kept in the app state; login compares digests.
#[derive(Debug, Clone)]
pub struct PasscodeDigest {
    digest: [u8; 32],
    pub from_fallback: bool,
}

impl PasscodeDigest {
    pub fn matches(&self, input: &str) -> bool {
        digest_of(input) == self.digest
    }
}

fn digest_of(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

/// Resolves the expected passcode from the environment, falling back to the
/// built-in default when the variable is unset or empty.
pub fn resolve_passcode() -> PasscodeDigest {
    resolve_from(std::env::var(PASSCODE_ENV).ok())
}

fn resolve_from(configured: Option<String>) -> PasscodeDigest {
    match configured.filter(|s| !s.is_empty()) {
        Some(secret) => PasscodeDigest {
            digest: digest_of(&secret),
            from_fallback: false,
        },
        None => PasscodeDigest {
            digest: digest_of(FALLBACK_PASSCODE),
            from_fallback: true,
        },
    }
}

/// Per-process session state. Only the two guard transitions mutate it:
/// `login` and `logout`. Everything downstream of the guard reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub authenticated: bool,
    /// The most recent rejected passcode attempt, kept so the prompt can
    /// re-render it; cleared on success and on logout.
    pub pending_input: Option<String>,
    pub auth_error: Option<String>,
    /// Last filter selection accepted by a dashboard render.
    pub selection: Option<Selection>,
    pub min_classes: Option<usize>,
}

impl SessionState {
    /// Passcode submission. A match authenticates and clears any earlier
    /// failure; a mismatch leaves `authenticated` untouched and records the
    /// message the next prompt render surfaces.
    pub fn login(&mut self, expected: &PasscodeDigest, input: &str) -> bool {
        if expected.matches(input) {
            self.authenticated = true;
            self.pending_input = None;
            self.auth_error = None;
            true
        } else {
            self.pending_input = Some(input.to_string());
            self.auth_error = Some(INCORRECT_PASSCODE.to_string());
            false
        }
    }

    /// Drops the whole session back to its initial state, residual filter
    /// selections included.
    pub fn logout(&mut self) {
        *self = SessionState::default();
    }

    pub fn remember_selection(&mut self, selection: Selection, min_classes: usize) {
        self.selection = Some(selection);
        self.min_classes = Some(min_classes);
    }
}
