//! Utility functions for rule implementations.

pub mod annotations;
pub mod directives;

// Re-export commonly used utilities for rule implementations
#[doc(inline)]
pub use annotations::{annotation_arguments, annotation_name, annotations_of, suppress_arguments};
#[doc(inline)]
pub use directives::{parse_directive, Directive};
