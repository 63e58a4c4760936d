//! Dispatch background worker library.
//!
//! The binary runs the expiry scheduler plus the maintenance jobs in
//! [`background`]; they live in a library so integration tests can drive
//! single passes.

pub mod background;
pub mod config;
