use axum::{
    extract::{rejection::FormRejection, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};

use crate::{
    auth,
    error::{AppError, AppResult},
    middleware::{session::is_local_path, Flash, SessionContext, SessionWrites},
    state::AppState,
    types::{LoginForm, RegisterForm},
    views::{self, Page},
};

/// Unreadable account forms are a bad request, rendered like any other.
fn read_form<T>(form: Result<Form<T>, FormRejection>) -> AppResult<T> {
    form.map(|Form(inner)| inner).map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

pub async fn register_form(session: SessionContext) -> Page {
    views::register(&session)
}

pub async fn register(
    State(state): State<AppState>,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> AppResult<Response> {
    let form = read_form(form)?;
    match auth::register(&state.db, &form, state.config.auth.bcrypt_cost).await {
        Ok(user) => {
            tracing::info!(user = %user.username, "Registered user");
            Ok((
                SessionWrites::flash(Flash::success("Welcome to Yelp Camp!")).login(user.id),
                Redirect::to("/campgrounds"),
            )
                .into_response())
        }
        Err(AppError::Conflict(msg)) | Err(AppError::BadRequest(msg)) => {
            Ok((SessionWrites::flash(Flash::error(msg)), Redirect::to("/register")).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn login_form(session: SessionContext) -> Page {
    views::login(&session)
}

pub async fn login(
    State(state): State<AppState>,
    session: SessionContext,
    form: Result<Form<LoginForm>, FormRejection>,
) -> AppResult<Response> {
    let form = read_form(form)?;
    let Some(user) = auth::authenticate(&state.db, &form.username, &form.password).await? else {
        tracing::info!(user = %form.username.trim(), "Failed login");
        return Ok((SessionWrites::flash(Flash::error("Password or username is incorrect")), Redirect::to("/login"))
            .into_response());
    };
    let target = session.return_to.filter(|p| is_local_path(p)).unwrap_or_else(|| "/campgrounds".to_string());
    Ok((SessionWrites::flash(Flash::success("Welcome back!")).login(user.id), Redirect::to(&target)).into_response())
}

pub async fn logout() -> Response {
    (SessionWrites::flash(Flash::success("Goodbye!")).logout(), Redirect::to("/campgrounds")).into_response()
}
