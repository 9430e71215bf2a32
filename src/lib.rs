pub mod clustering;
pub mod newick;
pub mod phylo;
pub mod tree;
pub mod weights;
