//! Newick text form for [PhyloTree]s.
//!
//! Grammar produced and accepted here:
//!
//! ```text
//! tree     ::= vertex [';']
//! vertex   ::= '(' vertex (',' vertex)* ')' tail | label tail
//! tail     ::= [label] [':' number]
//! ```
//!
//! Labels are unquoted and end at `( ) , : ;` or whitespace. The writer
//! never prints the root's branch length, and an unset branch length is
//! omitted entirely (an explicit `0` is printed). Branch lengths are written
//! in shortest round-trip form, always with a decimal point (`1.0`, not `1`).

use std::fmt::Display;
use std::fmt::Write as _;

use thiserror::Error;

use crate::phylo::{Clade, PhyloTree};
use crate::tree::{NodeId, TreeError};


#[derive(Error, Debug, PartialEq)]
pub enum NewickError {
    #[error("empty input")]
    Empty,

    #[error("unbalanced parenthesis at byte {0}")]
    Unbalanced(usize),

    #[error("unexpected character {ch:?} at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid branch length {text:?} at byte {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("trailing data after the tree at byte {0}")]
    TrailingData(usize),
}

enum Step {
    Enter { id: NodeId, at_root: bool },
    Comma,
    Close { id: NodeId, at_root: bool },
}

/// Serializes the subtree at `root`, iteratively.
pub fn to_newick<L: Display>(tree: &PhyloTree<L>, root: NodeId) -> Result<String, TreeError> {
    let mut out = String::new();
    let mut stack = vec![Step::Enter {
        id: root,
        at_root: true,
    }];

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter { id, at_root } => {
                let node = tree.get(id)?;
                if node.is_leaf() {
                    write_tail(&mut out, &node.data, at_root);
                } else {
                    out.push('(');
                    stack.push(Step::Close { id, at_root });
                    for (i, &child) in node.children().iter().enumerate().rev() {
                        stack.push(Step::Enter {
                            id: child,
                            at_root: false,
                        });
                        if i > 0 {
                            stack.push(Step::Comma);
                        }
                    }
                }
            }
            Step::Comma => out.push(','),
            Step::Close { id, at_root } => {
                out.push(')');
                write_tail(&mut out, &tree.get(id)?.data, at_root);
            }
        }
    }
    Ok(out)
}

fn write_tail<L: Display>(out: &mut String, clade: &Clade<L>, at_root: bool) {
    if let Some(label) = &clade.label {
        write!(out, "{label}").expect("writing to a String cannot fail");
    }
    if !at_root {
        if let Some(length) = clade.branch_length {
            // {:?} keeps the decimal point on whole values.
            write!(out, ":{length:?}").expect("writing to a String cannot fail");
        }
    }
}

/// Parses a single Newick string into a tree with `String` labels.
///
/// Returns the tree together with the handle of its root. Empty labels parse
/// to `None`, matching what the writer emits for unlabeled nodes.
pub fn parse(input: &str) -> Result<(PhyloTree<String>, NodeId), NewickError> {
    let bytes = input.as_bytes();
    let mut tree = PhyloTree::new();
    // Currently open internal nodes, outermost first.
    let mut open: Vec<NodeId> = Vec::new();
    // Node the next label/branch length applies to.
    let mut current: Option<NodeId> = None;
    // Whether the position since the last delimiter already produced a node.
    let mut have_child = false;
    let mut root: Option<NodeId> = None;
    let mut pos = 0;

    while pos < bytes.len() {
        let byte = bytes[pos];
        match byte {
            b'(' => {
                let id = tree.insert(Clade::unlabeled());
                if let Some(&parent) = open.last() {
                    attach(&mut tree, parent, id);
                } else if root.is_some() || have_child {
                    return Err(NewickError::TrailingData(pos));
                }
                open.push(id);
                current = None;
                have_child = false;
                pos += 1;
            }
            b',' => {
                let &parent = open.last().ok_or(NewickError::Unbalanced(pos))?;
                if !have_child {
                    // Positional hole like "(,A)": an unlabeled leaf.
                    let leaf = tree_leaf(&mut tree);
                    attach(&mut tree, parent, leaf);
                }
                current = None;
                have_child = false;
                pos += 1;
            }
            b')' => {
                let parent = open.pop().ok_or(NewickError::Unbalanced(pos))?;
                if !have_child {
                    let leaf = tree_leaf(&mut tree);
                    attach(&mut tree, parent, leaf);
                }
                current = Some(parent);
                have_child = true;
                if open.is_empty() {
                    root = Some(parent);
                }
                pos += 1;
            }
            b':' => {
                let id = match current {
                    Some(id) => id,
                    None => {
                        // Branch length on an implicit empty leaf, "(:1,B)".
                        let &parent = open.last().ok_or(NewickError::Unbalanced(pos))?;
                        if have_child {
                            return Err(NewickError::UnexpectedChar { ch: ':', pos });
                        }
                        let leaf = tree_leaf(&mut tree);
                        attach(&mut tree, parent, leaf);
                        have_child = true;
                        leaf
                    }
                };
                let mut start = pos + 1;
                while start < bytes.len() && bytes[start].is_ascii_whitespace() {
                    start += 1;
                }
                let end = scan_token(bytes, start);
                let text = &input[start..end];
                let length: f64 = text.parse().map_err(|_| NewickError::InvalidNumber {
                    text: text.to_string(),
                    pos: start,
                })?;
                tree.data_mut(id)
                    .expect("parser-created handle is always live")
                    .branch_length = Some(length);
                current = Some(id);
                pos = end;
            }
            b';' => {
                pos += 1;
                break;
            }
            b if b.is_ascii_whitespace() => pos += 1,
            _ => {
                let end = scan_token(bytes, pos);
                let label = input[pos..end].to_string();
                match current {
                    // Label of a just-closed internal node.
                    Some(id) => {
                        let clade = tree
                            .data_mut(id)
                            .expect("parser-created handle is always live");
                        if clade.label.is_some() || clade.branch_length.is_some() {
                            return Err(NewickError::UnexpectedChar {
                                ch: input[pos..].chars().next().unwrap_or('?'),
                                pos,
                            });
                        }
                        clade.label = Some(label);
                    }
                    // A leaf.
                    None => {
                        if have_child {
                            return Err(NewickError::UnexpectedChar {
                                ch: input[pos..].chars().next().unwrap_or('?'),
                                pos,
                            });
                        }
                        let leaf = tree.insert(Clade::new(label));
                        match open.last() {
                            Some(&parent) => attach(&mut tree, parent, leaf),
                            None => {
                                if root.is_some() {
                                    return Err(NewickError::TrailingData(pos));
                                }
                                root = Some(leaf);
                            }
                        }
                        current = Some(leaf);
                        have_child = true;
                    }
                }
                pos = end;
            }
        }
    }

    if !open.is_empty() {
        return Err(NewickError::Unbalanced(bytes.len()));
    }
    for rest in pos..bytes.len() {
        if !bytes[rest].is_ascii_whitespace() {
            return Err(NewickError::TrailingData(rest));
        }
    }
    match root {
        Some(root) => Ok((tree, root)),
        None => Err(NewickError::Empty),
    }
}

fn tree_leaf(tree: &mut PhyloTree<String>) -> NodeId {
    tree.insert(Clade::unlabeled())
}

fn attach(tree: &mut PhyloTree<String>, parent: NodeId, child: NodeId) {
    tree.append(parent, child)
        .expect("freshly created nodes always attach cleanly");
}

/// End of the label/number token starting at `start`.
fn scan_token(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() {
        match bytes[end] {
            b'(' | b')' | b',' | b':' | b';' => break,
            b if b.is_ascii_whitespace() => break,
            _ => end += 1,
        }
    }
    end
}
