//! Request handlers.

pub mod transcribe;
