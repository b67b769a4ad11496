//! Syntax tree consumed and mutated by the rule engine.
//!
//! The tree is an arena of nodes addressed by [`NodeId`]. Parent and child
//! relations are index links, so restructuring is a local rewrite of those
//! links and can never leave a dangling reference.

mod builder;
mod kind;
mod tree;

pub use builder::{Checkpoint, TreeBuilder};
pub use kind::NodeKind;
pub use tree::{NodeId, SyntaxTree};
