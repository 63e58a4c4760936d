//! External delivery channels for outbound signals.

pub mod webhook;
