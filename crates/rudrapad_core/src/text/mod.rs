//! Plain-text projections of rich-text note content.
//!
//! # Responsibility
//! - Strip editor markup for search, export and list previews.
//! - Derive word/character statistics for the editor footer.

pub mod plain;
