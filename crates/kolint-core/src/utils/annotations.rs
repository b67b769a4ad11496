//! Annotation helpers for rule implementations.

use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// Annotation names that carry suppressions.
pub const SUPPRESS_ANNOTATIONS: [&str; 2] = ["Suppress", "SuppressWarnings"];

/// Returns the annotations attached to `owner`.
///
/// For the file node these are the `@file:` annotations; for an annotated
/// expression the annotations written in front of it; for declarations the
/// annotations in the modifier list.
#[must_use]
pub fn annotations_of(tree: &SyntaxTree, owner: NodeId) -> Vec<NodeId> {
    let holders: Vec<NodeId> = match tree.kind(owner) {
        NodeKind::File => tree
            .children(owner)
            .iter()
            .copied()
            .filter(|&c| tree.kind(c) == NodeKind::FileAnnotationList)
            .collect(),
        NodeKind::AnnotatedExpression => vec![owner],
        _ => tree
            .find_child(owner, NodeKind::ModifierList)
            .into_iter()
            .collect(),
    };
    holders
        .into_iter()
        .flat_map(|holder| tree.children(holder).iter().copied())
        .filter(|&c| tree.kind(c) == NodeKind::Annotation)
        .collect()
}

/// Returns the simple name of an annotation, e.g. `Suppress` for
/// `@file:Suppress("x")`.
#[must_use]
pub fn annotation_name(tree: &SyntaxTree, annotation: NodeId) -> Option<&str> {
    tree.children(annotation)
        .iter()
        .rev()
        .find(|&&c| tree.kind(c) == NodeKind::Identifier)
        .map(|&c| tree.text(c))
}

/// Returns the argument texts of an annotation with string quotes removed.
#[must_use]
pub fn annotation_arguments(tree: &SyntaxTree, annotation: NodeId) -> Vec<String> {
    let Some(list) = tree.find_child(annotation, NodeKind::ValueArgumentList) else {
        return Vec::new();
    };
    tree.children(list)
        .iter()
        .filter(|&&c| tree.kind(c) == NodeKind::ValueArgument)
        .map(|&c| tree.text(c).trim().trim_matches('"').to_string())
        .collect()
}

/// Returns the arguments of every `@Suppress`/`@SuppressWarnings` annotation
/// on `owner`.
#[must_use]
pub fn suppress_arguments(tree: &SyntaxTree, owner: NodeId) -> Vec<String> {
    annotations_of(tree, owner)
        .into_iter()
        .filter(|&a| annotation_name(tree, a).is_some_and(|n| SUPPRESS_ANNOTATIONS.contains(&n)))
        .flat_map(|a| annotation_arguments(tree, a))
        .collect()
}
