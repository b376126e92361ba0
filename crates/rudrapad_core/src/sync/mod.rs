//! Cross-context synchronization.
//!
//! # Responsibility
//! - Absorb collection snapshots written by other contexts (`reconciler`).
//! - Keep the active selection consistent with the collection (`selection`).
//!
//! # Invariants
//! - Merging is whole-collection last-write-wins; there is no per-note merge.
//! - A corrupt external snapshot never clears local notes.

pub mod reconciler;
pub mod selection;
