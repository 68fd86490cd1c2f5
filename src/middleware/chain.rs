//! Ordered gate dispatcher.
//!
//! Routes declare the gates they need as a plain list. The dispatcher runs
//! them by stage (authenticate, then authorize, then validate) no matter how
//! the list is written, and stops at the first failure.

use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth;
use crate::middleware::session::SessionContext;
use crate::middleware::validation::{validate_payload, FormPayload, Schema};
use crate::types::{Campground, Principal, Review};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Authenticate,
    Authorize,
    Validate,
}

#[derive(Debug, Clone, Copy)]
pub enum Gate {
    RequireSession,
    CampgroundExists,
    CampgroundOwner,
    ReviewAuthor,
    Payload(&'static Schema),
}

impl Gate {
    pub fn stage(&self) -> Stage {
        match self {
            Gate::RequireSession => Stage::Authenticate,
            Gate::CampgroundExists | Gate::CampgroundOwner | Gate::ReviewAuthor => Stage::Authorize,
            Gate::Payload(_) => Stage::Validate,
        }
    }
}

/// What the gates look at: the session plus the raw path ids and body.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub session: &'a SessionContext,
    pub campground_id: Option<&'a str>,
    pub review_id: Option<&'a str>,
    pub payload: Option<&'a FormPayload>,
}

impl<'a> GateInput<'a> {
    pub fn new(session: &'a SessionContext) -> Self {
        Self { session, campground_id: None, review_id: None, payload: None }
    }

    pub fn campground(mut self, id: &'a str) -> Self {
        self.campground_id = Some(id);
        self
    }

    pub fn review(mut self, id: &'a str) -> Self {
        self.review_id = Some(id);
        self
    }

    pub fn payload(mut self, payload: &'a FormPayload) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Everything the gates established, handed to the route handler.
#[derive(Debug, Default)]
pub struct Cleared {
    pub principal: Option<Principal>,
    pub campground: Option<Campground>,
    pub review: Option<Review>,
}

impl Cleared {
    pub fn principal(&self) -> AppResult<&Principal> {
        self.principal.as_ref().ok_or(AppError::Unauthenticated)
    }

    pub fn take_campground(&mut self) -> AppResult<Campground> {
        self.campground.take().ok_or_else(|| anyhow::anyhow!("campground gate did not run").into())
    }
}

#[derive(Debug, Clone)]
pub struct GateChain {
    gates: Vec<Gate>,
}

impl GateChain {
    pub fn new(gates: &[Gate]) -> Self {
        let mut gates = gates.to_vec();
        // stable: declaration order is kept inside a stage
        gates.sort_by_key(Gate::stage);
        Self { gates }
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub async fn run(&self, db: &SqlitePool, input: GateInput<'_>) -> AppResult<Cleared> {
        let mut cleared = Cleared { principal: input.session.principal.clone(), ..Default::default() };
        for gate in &self.gates {
            match gate {
                Gate::RequireSession => {
                    auth::require_session(input.session)?;
                }
                Gate::CampgroundExists => {
                    let id = required_id(input.campground_id, "campground")?;
                    cleared.campground = Some(auth::require_campground(db, id).await?);
                }
                Gate::CampgroundOwner => {
                    let id = required_id(input.campground_id, "campground")?;
                    let principal = cleared.principal()?.clone();
                    cleared.campground = Some(auth::require_campground_owner(db, &principal, id).await?);
                }
                Gate::ReviewAuthor => {
                    let campground_id = required_id(input.campground_id, "campground")?;
                    let review_id = required_id(input.review_id, "review")?;
                    let principal = cleared.principal()?.clone();
                    cleared.review =
                        Some(auth::require_review_author(db, &principal, campground_id, review_id).await?);
                }
                Gate::Payload(schema) => match input.payload {
                    Some(payload) => validate_payload(schema, payload)?,
                    None => return Err(AppError::BadRequest(format!("\"{}\" is required", schema.name))),
                },
            }
        }
        Ok(cleared)
    }
}

fn required_id<'a>(id: Option<&'a str>, what: &str) -> AppResult<&'a str> {
    id.ok_or_else(|| anyhow::anyhow!("gate needs a {} id but the route supplied none", what).into())
}
