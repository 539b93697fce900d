// Report module - console output for dry runs

pub mod tree;

pub use tree::{LaunchTree, TreeNode, TreeSummary};
