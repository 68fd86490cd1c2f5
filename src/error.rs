use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::middleware::session::{Flash, SessionWrites};
use crate::views;

/// The primary error type for the application.
///
/// Every variant is user-visible: it either becomes a redirect carrying a flash
/// message or a rendered error page. Nothing here is fatal to the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// No session principal on a route that needs one.
    #[error("You must be signed in first!")]
    Unauthenticated,
    /// The principal does not own the resource. `redirect_to` is the resource page.
    #[error("You do not have permission to do that!")]
    Forbidden { redirect_to: String },
    /// The addressed resource does not exist.
    #[error("{message}")]
    NotFound { message: String, redirect_to: String },
    /// The payload failed validation. Carries the aggregated message.
    #[error("{0}")]
    BadRequest(String),
    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn campground_not_found() -> Self {
        AppError::NotFound {
            message: "Cannot find that campground!".to_string(),
            redirect_to: "/campgrounds".to_string(),
        }
    }

    pub fn review_not_found(campground_path: String) -> Self {
        AppError::NotFound { message: "Cannot find that review!".to_string(), redirect_to: campground_path }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::Forbidden { .. } | AppError::NotFound { .. } => {
                StatusCode::SEE_OTHER
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            AppError::Unauthenticated => {
                (SessionWrites::flash(Flash::error(message)).remember_return_to(), Redirect::to("/login"))
                    .into_response()
            }
            AppError::Forbidden { redirect_to } => {
                (SessionWrites::flash(Flash::error(message)), Redirect::to(&redirect_to)).into_response()
            }
            AppError::NotFound { redirect_to, .. } => {
                (SessionWrites::flash(Flash::error(message)), Redirect::to(&redirect_to)).into_response()
            }
            AppError::BadRequest(msg) => {
                tracing::debug!("Rejected payload: {}", msg);
                (StatusCode::BAD_REQUEST, views::error_page(StatusCode::BAD_REQUEST, &msg, None)).into_response()
            }
            AppError::Conflict(msg) => {
                (StatusCode::CONFLICT, views::error_page(StatusCode::CONFLICT, &msg, None)).into_response()
            }
            AppError::Database(msg) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Database error: {}", msg);
                internal_page(error_id)
            }
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!(%error_id, "Internal error: {:?}", e);
                internal_page(error_id)
            }
        }
    }
}

fn internal_page(error_id: uuid::Uuid) -> Response {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    let msg = format!("Oh no, something went wrong! (error id {})", error_id);
    (status, views::error_page(status, &msg, None)).into_response()
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound {
                message: "Record not found".to_string(),
                redirect_to: "/campgrounds".to_string(),
            },
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) => AppError::Database(db_err.message().to_string()),
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(anyhow::anyhow!("password hashing failed: {}", err))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(anyhow::anyhow!("blocking task failed: {}", err))
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;

/// Converts an `Option` into a `NotFound` error for a campground.
pub trait OptionExt<T> {
    fn or_campground_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_campground_not_found(self) -> AppResult<T> {
        self.ok_or_else(AppError::campground_not_found)
    }
}
