//! `GET /oauth/{integration}/callback` (spec §6.1) — OAuth authorization
//! code exchange, completing the flow `OAuthState` began. Per spec §7
//! this endpoint always redirects to a frontend page; it never returns
//! JSON to the browser, success or failure alike.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::response::Redirect;
use engagement_core::IntegrationKind;
use serde::Deserialize;

use crate::ServerConfig;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Providers that report an error themselves instead of a code
    /// (user denied consent, etc.) — surfaced verbatim.
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn redirect_to(base: &str, status_or_error_key: &str, value: &str, description: Option<&str>) -> Redirect {
    let mut url = format!("{base}?{status_or_error_key}={}", urlencode(value));
    if let Some(desc) = description {
        url.push_str(&format!("&error_description={}", urlencode(desc)));
    }
    Redirect::to(&url)
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

/// No `Result`/`AppError` here: every outcome, success or failure, is a
/// 302 redirect (spec §7), so error classification happens in the query
/// string rather than the HTTP status.
pub async fn callback(
    State(state): State<ServerConfig>,
    Path(integration): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let base = &state.oauth_redirect_base;

    if let Some(err) = query.error {
        return redirect_to(base, "error", &err, query.error_description.as_deref());
    }

    let Ok(integration) = IntegrationKind::from_str(&integration) else {
        return redirect_to(base, "error", "unknown_integration", None);
    };

    let Some(code) = query.code else {
        return redirect_to(base, "error", "missing_code", None);
    };

    let Some(token) = query.state else {
        return redirect_to(base, "error", "missing_state", None);
    };

    let oauth_state = match state.oauth_states.consume(&token).await {
        Ok(Some(s)) => s,
        Ok(None) => return redirect_to(base, "error", "invalid_state", None),
        Err(_) => return redirect_to(base, "error", "store_error", None),
    };

    if oauth_state.is_expired(state.clock.now()) {
        return redirect_to(base, "error", "state_expired", None);
    }

    let result = state
        .credentials
        .connect(
            &oauth_state.tenant,
            integration,
            &code,
            &oauth_state.redirect_uri,
            oauth_state.pkce_verifier.as_deref(),
        )
        .await;

    match result {
        Ok(()) => redirect_to(base, "status", "connected", None),
        Err(e) => redirect_to(base, "error", &e.category().to_string(), Some(&e.to_string())),
    }
}
