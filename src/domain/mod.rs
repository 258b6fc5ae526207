//! Domain layer types and invariants.

pub mod content;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod principals;
pub mod slug;
