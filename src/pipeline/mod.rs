//! Pipeline stages for spreadsheet-to-catalog generation.
//!
//! Each submodule implements one transformation step. Image resolution is
//! the only stage with network I/O; everything after it is pure.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ normalise ──▶ image ──▶ layout ──▶ render
//! (JSON)    (record.rs)   (fetch)   (blocks)   (crate::render)
//! ```
//!
//! 1. [`input`]: read the record array from a path or URL
//! 2. [`crate::record`]: apply field defaults per row
//! 3. [`image`]: classify and fetch every image reference with bounded
//!    concurrency; failures become placeholders
//! 4. [`decode`]: decode fetched bytes to RGB8; runs in `spawn_blocking`
//! 5. [`layout`]: cover, category groups, grid chunks as abstract blocks

pub mod decode;
pub mod image;
pub mod input;
pub mod layout;
