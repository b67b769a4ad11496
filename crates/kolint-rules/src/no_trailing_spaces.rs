//! Rule to disallow spaces at the end of a line.
//!
//! Trailing spaces are removed from whitespace, comments and KDoc. The last
//! line of a whitespace leaf holds the indentation of the next element and
//! is never touched.

use kolint_core::{NodeId, NodeKind, Rule, RuleContext, RuleDescriptor, SyntaxTree};

/// Rule id of no-trailing-spaces.
pub const ID: &str = "standard:no-trailing-spaces";

/// Reports and removes trailing spaces.
#[derive(Debug, Clone)]
pub struct NoTrailingSpaces {
    descriptor: RuleDescriptor,
}

impl Default for NoTrailingSpaces {
    fn default() -> Self {
        Self::new()
    }
}

impl NoTrailingSpaces {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(ID),
        }
    }
}

fn has_trailing_space(line: &str) -> bool {
    line.ends_with([' ', '\t'])
}

/// Returns the text of `leaf` with the trailing spaces of line `index`
/// removed.
fn trim_line(text: &str, index: usize) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| if i == index { line.trim_end_matches([' ', '\t']) } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

fn set_leaf_text(tree: &mut SyntaxTree, leaf: NodeId, text: &str) {
    if tree.kind(leaf).is_whitespace() {
        tree.upsert_whitespace_before(leaf, text);
    } else {
        tree.set_text(leaf, text);
    }
}

impl Rule for NoTrailingSpaces {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn description(&self) -> &'static str {
        "Disallows trailing spaces"
    }

    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
        let tree = cx.tree();
        let kind = tree.kind(node);
        if !tree.is_leaf(node) || kind.is_code() {
            return;
        }
        let keeps_last_line = kind != NodeKind::EolComment && tree.next_leaf(node).is_some();
        let lines: Vec<&str> = tree.text(node).split('\n').collect();
        let mut violations = Vec::new();
        let mut offset = tree.start(node);
        for (index, line) in lines.iter().enumerate() {
            let is_last = index + 1 == lines.len();
            if has_trailing_space(line) && !(is_last && keeps_last_line) {
                let trimmed = line.trim_end_matches([' ', '\t']).len();
                violations.push((index, offset + trimmed));
            }
            offset += line.len() + 1;
        }

        for (index, offset) in violations {
            cx.emit_with_fix(offset, "Trailing space(s)", |tree| {
                let text = trim_line(tree.text(node), index);
                set_leaf_text(tree, node, &text);
            });
        }
    }
}
