//! Arena-backed ordered trees with handle-based parent/child links.

pub mod arena;
pub mod traversal;


pub use arena::{Node, NodeId, Tree, TreeError};
pub use traversal::{Ancestors, Traverse};
