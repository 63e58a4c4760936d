//! Domain logic for the professional attribution (job dispatch) engine.
//!
//! This crate has zero internal dependencies so that the database layer,
//! the engine, the HTTP surface and the worker can all share it:
//!
//! - [`geo`] — coordinates and great-circle distance.
//! - [`eligibility`] — the pure Eligibility Evaluator and its closed set of
//!   condition kinds.
//! - [`attribution`] — attribution status state machine and re-broadcast
//!   policy.
//! - [`blacklist`] — blacklist reasons and strike policy.
//! - [`updates`] — update types and recipient kinds for the outbox ledger.
//! - [`booking`] — inbound `BookingConfirmed` signal and its validation.
//! - [`config`] — dispatch tuning loaded from the environment.

pub mod attribution;
pub mod blacklist;
pub mod booking;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod geo;
pub mod types;
pub mod updates;
