//! Merge core: version resolution, curation rules, and the merge engine.

pub mod engine;
pub mod resolve;
pub mod rules;

pub use engine::MergeEngine;
pub use resolve::{ReferencePoints, resolve};
pub use rules::{CurationRule, StatusHold};
