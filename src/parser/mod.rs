//! The two front ends over the token/reader pipeline:
//! strict JSON and format-preserving DJS.

pub mod djs;
pub mod json;
