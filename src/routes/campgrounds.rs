use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    error::{AppError, AppResult},
    geocode,
    middleware::{
        validation::{FormPayload, CAMPGROUND_SCHEMA},
        Flash, Gate, GateChain, GateInput, SessionContext, SessionWrites,
    },
    state::AppState,
    store::campgrounds,
    types::{Campground, CampgroundInput, GeoPoint, ImageRef},
    views::{self, Page},
};

pub async fn home(session: SessionContext) -> Page {
    views::home(&session)
}

pub async fn index(State(state): State<AppState>, session: SessionContext) -> AppResult<Page> {
    let all = campgrounds::list(&state.db).await?;
    Ok(views::index(&session, &all))
}

pub async fn new_form(State(state): State<AppState>, session: SessionContext) -> AppResult<Page> {
    GateChain::new(&[Gate::RequireSession]).run(&state.db, GateInput::new(&session)).await?;
    Ok(views::new_campground(&session))
}

pub async fn create(
    State(state): State<AppState>,
    session: SessionContext,
    payload: FormPayload,
) -> AppResult<Response> {
    let cleared = GateChain::new(&[Gate::RequireSession, Gate::Payload(&CAMPGROUND_SCHEMA)])
        .run(&state.db, GateInput::new(&session).payload(&payload))
        .await?;
    let author = cleared.principal()?;
    let mut input = CampgroundInput::from_payload(&payload)?;
    input.uploaded = state.images.save_all(payload.uploads()).await?;

    let geometry = geocode::locate_or_none(state.geocoder.as_ref(), &input.location).await;
    let campground = match campgrounds::insert(&state.db, author.id, &input, geometry).await {
        Ok(c) => c,
        Err(e) => {
            state.images.remove_all(&input.uploaded).await;
            return Err(e);
        }
    };
    tracing::info!(campground = %campground.id, author = %author.username, "Created campground");

    Ok((
        SessionWrites::flash(Flash::success("Successfully made a new campground!")),
        Redirect::to(&campground.path()),
    )
        .into_response())
}

pub async fn show(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
) -> AppResult<Page> {
    let id = uuid::Uuid::parse_str(&id).map_err(|_| AppError::campground_not_found())?;
    let detail = campgrounds::find_detail(&state.db, id).await?.ok_or_else(AppError::campground_not_found)?;
    Ok(views::show_campground(&session, &detail))
}

pub async fn edit_form(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
) -> AppResult<Page> {
    let mut cleared = GateChain::new(&[Gate::RequireSession, Gate::CampgroundOwner])
        .run(&state.db, GateInput::new(&session).campground(&id))
        .await?;
    let campground = cleared.take_campground()?;
    Ok(views::edit_campground(&session, &campground))
}

pub async fn update(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
    payload: FormPayload,
) -> AppResult<Response> {
    let mut cleared =
        GateChain::new(&[Gate::RequireSession, Gate::CampgroundOwner, Gate::Payload(&CAMPGROUND_SCHEMA)])
            .run(&state.db, GateInput::new(&session).campground(&id).payload(&payload))
            .await?;
    let existing = cleared.take_campground()?;
    let mut input = CampgroundInput::from_payload(&payload)?;
    input.uploaded = state.images.save_all(payload.uploads()).await?;

    let geometry: Option<GeoPoint> = if same_location(&existing.location, &input.location) {
        existing.geometry
    } else {
        geocode::locate_or_none(state.geocoder.as_ref(), &input.location).await
    };
    let campground = match campgrounds::update(&state.db, existing.id, &input, geometry).await {
        Ok(Some(c)) => c,
        Ok(None) => {
            state.images.remove_all(&input.uploaded).await;
            return Err(AppError::campground_not_found());
        }
        Err(e) => {
            state.images.remove_all(&input.uploaded).await;
            return Err(e);
        }
    };
    state.images.remove_all(&dropped_images(&existing, &campground)).await;
    tracing::info!(campground = %campground.id, "Updated campground");

    Ok((
        SessionWrites::flash(Flash::success("Successfully updated campground!")),
        Redirect::to(&campground.path()),
    )
        .into_response())
}

pub async fn delete(
    State(state): State<AppState>,
    session: SessionContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let mut cleared = GateChain::new(&[Gate::RequireSession, Gate::CampgroundOwner])
        .run(&state.db, GateInput::new(&session).campground(&id))
        .await?;
    let campground = cleared.take_campground()?;
    if !campgrounds::delete(&state.db, campground.id).await? {
        return Err(AppError::campground_not_found());
    }
    state.images.remove_all(&campground.images).await;
    tracing::info!(campground = %campground.id, "Deleted campground");

    Ok((SessionWrites::flash(Flash::success("Successfully deleted campground!")), Redirect::to("/campgrounds"))
        .into_response())
}

/// Images present before an update and gone after it.
fn dropped_images(before: &Campground, after: &Campground) -> Vec<ImageRef> {
    before
        .images
        .iter()
        .filter(|old| !after.images.iter().any(|kept| kept.filename == old.filename))
        .cloned()
        .collect()
}

fn same_location(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
