//! Core pipeline — coin qualification and retrospective review.

pub mod qualifier;
pub mod review;

pub use qualifier::{Qualifier, QualifierConfig};
pub use review::{ReviewReport, Reviewer};
