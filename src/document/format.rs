//! Text codec for craft/cfg documents.
//!
//! ```text
//! ship = Falcon
//! PART
//! {
//!     part = mk1pod_4294
//!     MODULE
//!     {
//!         name = BDModulePilotAI
//!         steerMult = 2.0
//!     }
//! }
//! ```

use super::tree::{ConfigTree, NodeId};
use crate::error::{EvolutionError, Result};

pub fn parse(text: &str) -> Result<ConfigTree> {
    let mut tree = ConfigTree::new();
    let mut open: Vec<NodeId> = vec![tree.root()];
    let mut pending: Option<(String, usize)> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if line == "{" {
            let (kind, _) = pending.take().ok_or_else(|| EvolutionError::Parse {
                line: line_no,
                message: "'{' without a node name".to_string(),
            })?;
            let parent = current(&open);
            open.push(tree.add_node(parent, &kind));
            continue;
        }

        if let Some((kind, at)) = pending.take() {
            return Err(EvolutionError::Parse {
                line: line_no,
                message: format!("expected '{{' after node '{}' (line {})", kind, at),
            });
        }

        if line == "}" {
            if open.len() == 1 {
                return Err(EvolutionError::Parse {
                    line: line_no,
                    message: "unbalanced '}'".to_string(),
                });
            }
            open.pop();
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let parent = current(&open);
            tree.add_value(parent, key.trim(), value.trim());
            continue;
        }

        if let Some(kind) = line.strip_suffix('{') {
            let parent = current(&open);
            open.push(tree.add_node(parent, kind.trim()));
            continue;
        }

        pending = Some((line.to_string(), line_no));
    }

    if let Some((kind, at)) = pending {
        return Err(EvolutionError::Parse {
            line: at,
            message: format!("node '{}' has no body", kind),
        });
    }
    if open.len() > 1 {
        return Err(EvolutionError::Parse {
            line: text.lines().count(),
            message: format!("{} unclosed node(s) at end of input", open.len() - 1),
        });
    }

    Ok(tree)
}

pub fn write(tree: &ConfigTree) -> String {
    let mut out = String::new();
    let root = tree.root();

    for (key, value) in tree.fields(root) {
        push_field(&mut out, 0, key, value);
    }

    // (node, depth, closing) frames keep the writer iterative
    let mut stack: Vec<(NodeId, usize, bool)> = tree
        .children(root)
        .iter()
        .rev()
        .map(|child| (*child, 0, false))
        .collect();

    while let Some((id, depth, closing)) = stack.pop() {
        if closing {
            push_indent(&mut out, depth);
            out.push_str("}\n");
            continue;
        }

        push_indent(&mut out, depth);
        out.push_str(tree.kind(id));
        out.push('\n');
        push_indent(&mut out, depth);
        out.push_str("{\n");
        for (key, value) in tree.fields(id) {
            push_field(&mut out, depth + 1, key, value);
        }

        stack.push((id, depth, true));
        stack.extend(
            tree.children(id)
                .iter()
                .rev()
                .map(|child| (*child, depth + 1, false)),
        );
    }

    out
}

fn current(open: &[NodeId]) -> NodeId {
    // The root frame is never popped
    open[open.len() - 1]
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn push_field(out: &mut String, depth: usize, key: &str, value: &str) {
    push_indent(out, depth);
    out.push_str(key);
    out.push_str(" = ");
    out.push_str(value);
    out.push('\n');
}
