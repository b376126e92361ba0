//! Use-case services on top of repository and sync layers.
//!
//! # Responsibility
//! - Orchestrate one context's notes state (`session`).
//! - Keep presentation collaborators (unlock gate, export) out of the core
//!   synchronization model.

pub mod export;
pub mod session;
pub mod unlock;
