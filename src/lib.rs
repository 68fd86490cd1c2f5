//! # YelpCamp
//!
//! A server-rendered campground listing site: users register, log in, post
//! campgrounds with images and a map location, and review each other's
//! campgrounds.
//!
//! ## Architecture
//!
//! - **Axum** for routing and middleware
//! - **SQLx** over SQLite for persistence
//! - **Tokio** as the async runtime
//! - Signed cookies (`axum-extra`) for sessions and flash messages
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (embedded defaults, file, environment)
//! - [`db`]: schema initialization
//! - [`store`]: user, campground and review persistence
//! - [`auth`]: the local username/password strategy
//! - [`middleware`]: method override, sessions, gate chain, validation, security headers
//! - [`routes`]: HTTP handlers and router assembly
//! - [`views`]: HTML rendering
//! - [`geocode`]: location lookup for the campground map
//! - [`uploads`]: storage for uploaded campground images
//! - [`error`]: the user-visible error taxonomy
//! - [`state`]: shared application state
//! - [`types`]: domain types

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod geocode;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;
pub mod uploads;
pub mod views;

#[cfg(test)]
mod tests;
