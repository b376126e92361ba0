//! Note persistence and the canonical in-memory collection.
//!
//! # Responsibility
//! - Adapt the note collection to the origin key-value store (`note_store`).
//! - Own the in-memory collection and its mutation rules (`note_repo`).
//!
//! # Invariants
//! - The whole collection is the unit of persistence; no partial writes.
//! - Malformed persisted data never propagates as an error to callers.

pub mod note_repo;
pub mod note_store;
