//! Core domain types: label geometry and job state.

pub mod geometry;
pub mod job;

pub use geometry::{mm_to_dots, LabelGeometry};
pub use job::{DatapointValue, JobState, LineItem, UomType};
