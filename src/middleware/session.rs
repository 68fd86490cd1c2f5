//! Cookie-backed sessions and flash messages.
//!
//! Three signed cookies carry all per-user state: the session (user id), a
//! one-shot flash message and the URL to return to after logging in.
//! [`session_middleware`] resolves them into a [`SessionContext`] request
//! extension before the handler runs, and afterwards applies whatever
//! [`SessionWrites`] the handler (or an error response) attached.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Method},
    middleware::Next,
    response::{IntoResponse, IntoResponseParts, Response, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::AppState;
use crate::store::users;
use crate::types::Principal;

pub const FLASH_COOKIE: &str = "flash";
pub const RETURN_TO_COOKIE: &str = "return_to";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: FlashKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: FlashKind::Error, message: message.into() }
    }

    fn encode(&self) -> String {
        // serializing a plain struct cannot fail
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    fn decode(raw: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Per-request session view handed to handlers.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub principal: Option<Principal>,
    /// Flash set by the previous response, if any.
    pub flash: Option<Flash>,
    /// Where to go after a successful login.
    pub return_to: Option<String>,
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<SessionContext>().cloned().unwrap_or_default())
    }
}

/// Response marker: the rendered page displayed the pending flash.
#[derive(Debug, Clone, Copy)]
pub struct FlashShown;

/// Session changes requested by a response. Attached as a response part and
/// consumed by [`session_middleware`].
#[derive(Debug, Clone, Default)]
pub struct SessionWrites {
    pub flash: Option<Flash>,
    pub login: Option<Uuid>,
    pub logout: bool,
    pub remember_return_to: bool,
    pub clear_return_to: bool,
}

impl SessionWrites {
    pub fn flash(flash: Flash) -> Self {
        Self { flash: Some(flash), ..Default::default() }
    }

    pub fn login(mut self, user_id: Uuid) -> Self {
        self.login = Some(user_id);
        self.clear_return_to = true;
        self
    }

    pub fn logout(mut self) -> Self {
        self.logout = true;
        self
    }

    /// Store the current GET URL so login can send the user back to it.
    pub fn remember_return_to(mut self) -> Self {
        self.remember_return_to = true;
        self
    }
}

impl IntoResponseParts for SessionWrites {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.extensions_mut().insert(self);
        Ok(res)
    }
}

/// Only same-site absolute paths are accepted as login return targets.
pub fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

fn base_cookie(name: String, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value)).path("/").http_only(true).same_site(SameSite::Lax).secure(secure).build()
}

fn removal(name: String) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

async fn resolve_principal(state: &AppState, jar: &SignedCookieJar) -> crate::error::AppResult<Option<Principal>> {
    let Some(cookie) = jar.get(&state.config.session.cookie_name) else {
        return Ok(None);
    };
    let Ok(id) = Uuid::parse_str(cookie.value()) else {
        return Ok(None);
    };
    Ok(users::find_by_id(&state.db, id).await?.map(Principal::from))
}

/// Resolves the session principal and flash before the handler, applies
/// [`SessionWrites`] after it.
///
/// A pending flash is cleared only by a response carrying [`FlashShown`].
/// Redirects, health checks and error pages rendered without the session keep
/// it for the next page that displays it.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let is_get = req.method() == Method::GET;
    let original_uri = req.uri().path_and_query().map(|pq| pq.to_string()).unwrap_or_else(|| "/".to_string());

    let principal = match resolve_principal(&state, &jar).await {
        Ok(p) => p,
        Err(e) => return e.into_response(),
    };
    let incoming_flash = jar.get(FLASH_COOKIE).and_then(|c| Flash::decode(c.value()));
    let return_to = jar.get(RETURN_TO_COOKIE).map(|c| c.value().to_string()).filter(|p| is_local_path(p));
    let had_flash = incoming_flash.is_some();
    req.extensions_mut().insert(SessionContext { principal, flash: incoming_flash, return_to });

    let mut res = next.run(req).await;
    let writes = res.extensions_mut().remove::<SessionWrites>().unwrap_or_default();

    let cfg = &state.config.session;
    // removals are only emitted for cookies the request carried
    let mut out = jar;

    if let Some(flash) = writes.flash {
        out = out.add(base_cookie(FLASH_COOKIE.to_string(), flash.encode(), cfg.secure));
    } else if had_flash && res.extensions_mut().remove::<FlashShown>().is_some() {
        out = out.remove(removal(FLASH_COOKIE.to_string()));
    }

    if writes.logout {
        out = out.remove(removal(cfg.cookie_name.clone()));
    }
    if let Some(user_id) = writes.login {
        let mut cookie = base_cookie(cfg.cookie_name.clone(), user_id.to_string(), cfg.secure);
        cookie.set_max_age(time::Duration::days(cfg.max_age_days));
        out = out.add(cookie);
    }

    if writes.remember_return_to && is_get && is_local_path(&original_uri) {
        out = out.add(base_cookie(RETURN_TO_COOKIE.to_string(), original_uri, cfg.secure));
    } else if writes.clear_return_to {
        out = out.remove(removal(RETURN_TO_COOKIE.to_string()));
    }

    (out, res).into_response()
}
