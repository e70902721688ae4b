//! Core types shared by traversal, discovery, and bundling.

pub mod errors;
pub mod model;
