//! API endpoint handlers.
//!
//! Handlers are thin: open a connection, call the service with the
//! authenticated `Caller`, shape the response.

pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod referrals;
pub mod signup;
