//! Rule to enforce or forbid a newline at the end of a file.
//!
//! # Configuration
//!
//! Uses `insert_final_newline` (default `true`). Empty files are ignored.

use kolint_core::{NodeId, Rule, RuleContext, RuleDescriptor};

/// Rule id of final-newline.
pub const ID: &str = "standard:final-newline";

/// Checks the end of the file against `insert_final_newline`.
#[derive(Debug, Clone)]
pub struct FinalNewline {
    descriptor: RuleDescriptor,
}

impl Default for FinalNewline {
    fn default() -> Self {
        Self::new()
    }
}

impl FinalNewline {
    /// Creates a new rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(ID),
        }
    }
}

fn require_newline(cx: &mut RuleContext<'_>, last: NodeId) {
    let tree = cx.tree();
    if tree.full_text().ends_with('\n') {
        return;
    }
    let offset = tree.text_len();
    if tree.kind(last).is_whitespace() {
        let text = format!("{}\n", tree.text(last));
        cx.emit_with_fix(offset, "File must end with a newline (\\n)", |tree| {
            tree.upsert_whitespace_before(last, &text);
        });
    } else {
        cx.emit_with_fix(offset, "File must end with a newline (\\n)", |tree| {
            tree.upsert_whitespace_after(last, "\n");
        });
    }
}

fn forbid_newline(cx: &mut RuleContext<'_>, last: NodeId) {
    let tree = cx.tree();
    if !tree.is_whitespace_with_newline(last) {
        return;
    }
    let trimmed = tree.text(last).trim_end().to_string();
    let offset = tree.start(last);
    cx.emit_with_fix(offset, "Redundant newline (\\n) at the end of file", |tree| {
        tree.upsert_whitespace_before(last, &trimmed);
    });
}

impl Rule for FinalNewline {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn description(&self) -> &'static str {
        "Checks for a newline at the end of the file"
    }

    fn visit(&self, node: NodeId, cx: &mut RuleContext<'_>) {
        let tree = cx.tree();
        if node != tree.root() {
            return;
        }
        let Some(last) = tree.last_leaf(node) else {
            return;
        };
        if tree.text_len() == 0 {
            return;
        }
        if cx.settings().insert_final_newline {
            require_newline(cx, last);
        } else {
            forbid_newline(cx, last);
        }
        cx.stop_traversal();
    }
}
