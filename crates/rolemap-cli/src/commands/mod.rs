//! CLI command implementations for rolemap.

pub mod apply;
pub mod validate;
