pub mod container;
pub mod graph_tree;
pub mod path;
pub mod tree;

pub use self::graph_tree::InnerTree;
pub use self::tree::{Direction, TreeError};
