//! Various unsorted data structures.

pub use self::avl_tree::{AvlTree, Iter as AvlTreeIter};

mod avl_tree;
