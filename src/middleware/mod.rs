//! Request pipeline pieces.
//!
//! Order per request: method override, session resolution, then the route's
//! gate chain (authentication, ownership, payload validation). Security
//! headers wrap everything.

pub mod auth;
pub mod chain;
pub mod method_override;
pub mod security_headers;
pub mod session;
pub mod validation;

pub use chain::{Gate, GateChain, GateInput};
pub use session::{Flash, SessionContext, SessionWrites};
