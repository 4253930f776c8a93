use crate::errors::AppError;
use crate::extract::{session_cookie, AuthContext, IncrementParams};
use crate::models::{
    ClientConfig, IncrementResponse, FAILED_MESSAGE, REST_NONCE_ACTION, SESSION_COOKIE,
    SUM_OPTION,
};
use crate::nonce::new_session_id;
use crate::state::AppState;
use crate::storage::OptionStore;
use crate::ui::{render_page, CLIENT_SCRIPT, STYLESHEET};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::{debug, info};

/// Page embedding the counter fragment, with a fresh nonce and the route URL injected.
/// Visitors without a session cookie get one; the nonce is bound to it.
pub async fn index<S: OptionStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let (session, issued) = match session_cookie(&headers) {
        Some(session) => (session.to_string(), false),
        None => (new_session_id().map_err(AppError::internal)?, true),
    };

    let sum = state.options.get_option(SUM_OPTION, 0).await?;
    let config = ClientConfig {
        nonce: state.nonces.create(REST_NONCE_ACTION, &session),
        rest_url: state.rest_url.clone(),
    };
    let page = Html(render_page(&config, sum).map_err(AppError::internal)?);

    if issued {
        debug!("issued new session");
        let cookie = format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly; SameSite=Lax");
        Ok(([(header::SET_COOKIE, cookie)], page).into_response())
    } else {
        Ok(page.into_response())
    }
}

pub async fn script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

pub async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

pub async fn increment<S: OptionStore>(
    State(state): State<AppState<S>>,
    auth: AuthContext,
    params: IncrementParams,
) -> Result<Json<IncrementResponse>, AppError> {
    if !permissions_check(&auth) {
        return Err(AppError::forbidden());
    }

    debug!(?auth, sum = ?params.sum, "increment requested");
    let response = apply_increment(state.options.as_ref(), params).await?;
    Ok(Json(response))
}

/// Everyone may increment. Tighter policies would be `auth.is_verified()` for any
/// session, or a capability check once users exist.
pub fn permissions_check(_auth: &AuthContext) -> bool {
    true
}

/// Bumps the stored counter by one.
///
/// A missing `sum` defaults to zero, so the failed branch is unreachable and the
/// submitted value is only ever checked for presence, never added. Kept as-is because
/// clients depend on the "always succeeds" behaviour; it looks like a latent bug.
pub async fn apply_increment<S: OptionStore>(
    options: &S,
    params: IncrementParams,
) -> Result<IncrementResponse, AppError> {
    let sum = params.sum.or(Some(0.0));
    let response = match sum {
        Some(_) => {
            let current = options.get_option(SUM_OPTION, 0).await?;
            let next = current
                .checked_add(1)
                .ok_or_else(|| AppError::counter_overflow(SUM_OPTION))?;
            options.update_option(SUM_OPTION, next).await?;
            info!(value = next, "counter incremented");
            IncrementResponse::success(next)
        }
        None => IncrementResponse::failed(FAILED_MESSAGE),
    };

    Ok(response)
}
