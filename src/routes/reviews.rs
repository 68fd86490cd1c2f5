use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    error::{AppError, AppResult},
    middleware::{
        validation::{FormPayload, REVIEW_SCHEMA},
        Flash, Gate, GateChain, GateInput, SessionContext, SessionWrites,
    },
    state::AppState,
    store::reviews,
    types::{campground_path, ReviewInput},
};

pub async fn create(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
    payload: FormPayload,
) -> AppResult<Response> {
    let mut cleared =
        GateChain::new(&[Gate::RequireSession, Gate::CampgroundExists, Gate::Payload(&REVIEW_SCHEMA)])
            .run(&state.db, GateInput::new(&session).campground(&id).payload(&payload))
            .await?;
    let campground = cleared.take_campground()?;
    let author = cleared.principal()?;
    let input = ReviewInput::from_payload(&payload)?;

    let review = reviews::insert(&state.db, campground.id, author.id, &input).await?;
    tracing::info!(review = %review.id, campground = %campground.id, "Created review");

    Ok((SessionWrites::flash(Flash::success("Created new review!")), Redirect::to(&campground.path()))
        .into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    session: SessionContext,
    Path((id, review_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let cleared = GateChain::new(&[Gate::RequireSession, Gate::ReviewAuthor])
        .run(&state.db, GateInput::new(&session).campground(&id).review(&review_id))
        .await?;
    let review = cleared.review.ok_or_else(|| anyhow::anyhow!("review gate did not run"))?;
    let back = campground_path(review.campground_id);
    if !reviews::delete(&state.db, review.id).await? {
        return Err(AppError::review_not_found(back));
    }
    tracing::info!(review = %review.id, "Deleted review");

    Ok((SessionWrites::flash(Flash::success("Successfully deleted review")), Redirect::to(&back)).into_response())
}
