//! Content backend for a bilingual consultancy site.
//!
//! Live content is pushed from a document store and merged over bundled
//! fallback content; admins save edits back through the same store and
//! visitors submit contact requests.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub(crate) mod util;
