//! Outer surfaces that feed requests into the engine and render its results.

pub mod csv;
