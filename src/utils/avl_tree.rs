use core::cmp::Ordering;
use core::fmt;
use core::mem;
use core::ops::ControlFlow;
use slab::Slab;

#[derive(Clone)]
struct AvlNode<K, V> {
    key: K,
    value: V,
    left: Option<usize>,
    right: Option<usize>,
    parent: Option<usize>,
    /// Number of nodes on the longest path from this node to a leaf, this node included.
    height: usize,
}

/// An ordered map implemented as a self-balancing AVL tree.
///
/// Nodes are stored in a [`Slab`] and reference each other by index. Each node knows its parent,
/// so rebalancing after an insertion or a removal walks back to the root without any auxiliary
/// stack, and in-order enumeration doesn’t need to allocate.
///
/// The heights of the two subtrees of any node differ by at most one, so the height of a tree
/// with `n` entries is `O(log(n))`.
#[derive(Clone)]
pub struct AvlTree<K, V> {
    nodes: Slab<AvlNode<K, V>>,
    root: Option<usize>,
}

impl<K, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> AvlTree<K, V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Slab::new(),
            root: None,
        }
    }

    /// The number of entries of this tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Does this tree have no entry?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Removes all the entries of this tree.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// The number of nodes on the longest path from the root to a leaf.
    ///
    /// This is `0` for an empty tree.
    #[inline]
    pub fn height(&self) -> usize {
        self.height_of(self.root)
    }

    /// The entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let id = self.leftmost(self.root?);
        Some(self.entry(id))
    }

    /// The entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let id = self.rightmost(self.root?);
        Some(self.entry(id))
    }

    /// Calls `f` on each entry by increasing key order, until it breaks.
    ///
    /// Returns the value `f` broke with, if any.
    pub fn enumerate_forward<B>(
        &self,
        mut f: impl FnMut(&K, &V) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        let mut curr = self.root.map(|root| self.leftmost(root));

        while let Some(id) = curr {
            let (key, value) = self.entry(id);
            f(key, value)?;
            curr = self.successor(id);
        }

        ControlFlow::Continue(())
    }

    /// Calls `f` on each entry by decreasing key order, until it breaks.
    ///
    /// Returns the value `f` broke with, if any.
    pub fn enumerate_backward<B>(
        &self,
        mut f: impl FnMut(&K, &V) -> ControlFlow<B>,
    ) -> ControlFlow<B> {
        let mut curr = self.root.map(|root| self.rightmost(root));

        while let Some(id) = curr {
            let (key, value) = self.entry(id);
            f(key, value)?;
            curr = self.predecessor(id);
        }

        ControlFlow::Continue(())
    }

    /// Iterates through the entries of this tree by increasing key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tree: self,
            next: self.root.map(|root| self.leftmost(root)),
            remaining: self.len(),
        }
    }

    /// Iterates through the keys of this tree in increasing order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    #[inline]
    fn entry(&self, id: usize) -> (&K, &V) {
        let node = &self.nodes[id];
        (&node.key, &node.value)
    }

    #[inline]
    fn height_of(&self, id: Option<usize>) -> usize {
        id.map(|id| self.nodes[id].height).unwrap_or(0)
    }

    #[inline]
    fn balance_factor(&self, id: usize) -> isize {
        let node = &self.nodes[id];
        self.height_of(node.left) as isize - self.height_of(node.right) as isize
    }

    #[inline]
    fn update_height(&mut self, id: usize) {
        let node = &self.nodes[id];
        let height = self.height_of(node.left).max(self.height_of(node.right)) + 1;
        self.nodes[id].height = height;
    }

    fn leftmost(&self, mut id: usize) -> usize {
        while let Some(left) = self.nodes[id].left {
            id = left;
        }
        id
    }

    fn rightmost(&self, mut id: usize) -> usize {
        while let Some(right) = self.nodes[id].right {
            id = right;
        }
        id
    }

    fn successor(&self, mut id: usize) -> Option<usize> {
        if let Some(right) = self.nodes[id].right {
            return Some(self.leftmost(right));
        }

        while let Some(parent) = self.nodes[id].parent {
            if self.nodes[parent].left == Some(id) {
                return Some(parent);
            }
            id = parent;
        }

        None
    }

    fn predecessor(&self, mut id: usize) -> Option<usize> {
        if let Some(left) = self.nodes[id].left {
            return Some(self.rightmost(left));
        }

        while let Some(parent) = self.nodes[id].parent {
            if self.nodes[parent].right == Some(id) {
                return Some(parent);
            }
            id = parent;
        }

        None
    }

    /// Makes `new` take the place of the child `old` of `parent`, or of the root.
    fn replace_child(&mut self, parent: Option<usize>, old: usize, new: Option<usize>) {
        match parent {
            None => self.root = new,
            Some(parent) => {
                let parent = &mut self.nodes[parent];
                if parent.left == Some(old) {
                    parent.left = new;
                } else {
                    debug_assert_eq!(parent.right, Some(old));
                    parent.right = new;
                }
            }
        }
    }

    /// Rotates the subtree rooted at `id` to the left and returns its new root.
    fn rotate_left(&mut self, id: usize) -> usize {
        let Some(pivot) = self.nodes[id].right else {
            return id;
        };

        let inner = self.nodes[pivot].left;
        self.nodes[id].right = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(id);
        }

        let parent = self.nodes[id].parent;
        self.nodes[pivot].parent = parent;
        self.replace_child(parent, id, Some(pivot));

        self.nodes[pivot].left = Some(id);
        self.nodes[id].parent = Some(pivot);

        self.update_height(id);
        self.update_height(pivot);
        pivot
    }

    /// Rotates the subtree rooted at `id` to the right and returns its new root.
    fn rotate_right(&mut self, id: usize) -> usize {
        let Some(pivot) = self.nodes[id].left else {
            return id;
        };

        let inner = self.nodes[pivot].right;
        self.nodes[id].left = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(id);
        }

        let parent = self.nodes[id].parent;
        self.nodes[pivot].parent = parent;
        self.replace_child(parent, id, Some(pivot));

        self.nodes[pivot].right = Some(id);
        self.nodes[id].parent = Some(pivot);

        self.update_height(id);
        self.update_height(pivot);
        pivot
    }

    /// Restores the heights and the balance of every node from `start` to the root.
    fn rebalance(&mut self, start: Option<usize>) {
        let mut curr = start;

        while let Some(mut id) = curr {
            self.update_height(id);
            let balance = self.balance_factor(id);

            if balance > 1 {
                if let Some(left) = self.nodes[id].left {
                    if self.balance_factor(left) < 0 {
                        let _ = self.rotate_left(left);
                    }
                }
                id = self.rotate_right(id);
            } else if balance < -1 {
                if let Some(right) = self.nodes[id].right {
                    if self.balance_factor(right) > 0 {
                        let _ = self.rotate_right(right);
                    }
                }
                id = self.rotate_left(id);
            }

            curr = self.nodes[id].parent;
        }
    }

    /// Unlinks the node `id`, which must have at most one child, and returns its entry.
    fn unlink(&mut self, id: usize) -> (K, V) {
        let node = &self.nodes[id];
        debug_assert!(node.left.is_none() || node.right.is_none());
        let child = node.left.or(node.right);
        let parent = node.parent;

        if let Some(child) = child {
            self.nodes[child].parent = parent;
        }
        self.replace_child(parent, id, child);

        let removed = self.nodes.remove(id);
        self.rebalance(parent);
        (removed.key, removed.value)
    }
}

impl<K: Ord, V> AvlTree<K, V> {
    fn find(&self, key: &K) -> Option<usize> {
        let mut curr = self.root;

        while let Some(id) = curr {
            let node = &self.nodes[id];
            curr = match key.cmp(&node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }

        None
    }

    /// The value associated to `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|id| &self.nodes[id].value)
    }

    /// Mutable reference to the value associated to `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find(key).map(|id| &mut self.nodes[id].value)
    }

    /// Does this tree have an entry for `key`?
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts a new node and returns its index, or returns the index of the existing node with
    /// the same key together with the rejected entry.
    fn find_or_insert(&mut self, key: K, value: V) -> Result<usize, (usize, K, V)> {
        let mut parent = None;
        let mut curr = self.root;
        let mut went_left = false;

        while let Some(id) = curr {
            let node = &self.nodes[id];
            parent = Some(id);
            curr = match key.cmp(&node.key) {
                Ordering::Less => {
                    went_left = true;
                    node.left
                }
                Ordering::Greater => {
                    went_left = false;
                    node.right
                }
                Ordering::Equal => return Err((id, key, value)),
            };
        }

        let id = self.nodes.insert(AvlNode {
            key,
            value,
            left: None,
            right: None,
            parent,
            height: 1,
        });

        match parent {
            None => self.root = Some(id),
            Some(parent) if went_left => self.nodes[parent].left = Some(id),
            Some(parent) => self.nodes[parent].right = Some(id),
        }

        self.rebalance(parent);
        Ok(id)
    }

    /// Inserts a new entry.
    ///
    /// Fails if an entry with the same key already exists, in which case the tree is left
    /// untouched and the given key and value are returned back.
    pub fn insert(&mut self, key: K, value: V) -> Result<&V, (K, V)> {
        match self.find_or_insert(key, value) {
            Ok(id) => Ok(&self.nodes[id].value),
            Err((_, key, value)) => Err((key, value)),
        }
    }

    /// Inserts an entry, or overwrites the value of the existing entry with the same key.
    ///
    /// Returns the previous value, if any.
    pub fn update(&mut self, key: K, value: V) -> Option<V> {
        match self.find_or_insert(key, value) {
            Ok(_) => None,
            Err((id, _, value)) => Some(mem::replace(&mut self.nodes[id].value, value)),
        }
    }

    /// Removes the entry with the given key and returns its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes the entry with the given key and returns it.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let id = self.find(key)?;
        let (left, right) = (self.nodes[id].left, self.nodes[id].right);

        if let (Some(_), Some(right)) = (left, right) {
            // Move the entry to its in-order successor, which has no left child, and unlink
            // the successor instead.
            let successor = self.leftmost(right);
            if let Some((node, succ)) = self.nodes.get2_mut(id, successor) {
                mem::swap(&mut node.key, &mut succ.key);
                mem::swap(&mut node.value, &mut succ.value);
            }
            Some(self.unlink(successor))
        } else {
            Some(self.unlink(id))
        }
    }

    /// Panics if this tree is not a valid AVL tree.
    ///
    /// Checks key ordering, parent links, cached heights and the balance of every node. This is
    /// mostly a utility for debugging.
    pub fn assert_balanced(&self) {
        if let Some(root) = self.root {
            assert_eq!(self.nodes[root].parent, None, "The root has a parent.");
            let count = self.assert_subtree_balanced(root, None, None);
            assert_eq!(count, self.len(), "Some nodes are not reachable from the root.");
        } else {
            assert!(self.nodes.is_empty(), "Some nodes are not reachable from the root.");
        }
    }

    /// Checks the subtree rooted at `id`, whose keys must lie in `(lower, upper)`, and returns
    /// its node count.
    fn assert_subtree_balanced(&self, id: usize, lower: Option<&K>, upper: Option<&K>) -> usize {
        let node = &self.nodes[id];
        assert!(lower.map_or(true, |lower| *lower < node.key), "Unordered keys.");
        assert!(upper.map_or(true, |upper| node.key < *upper), "Unordered keys.");

        let mut count = 1;
        for child in [node.left, node.right].into_iter().flatten() {
            assert_eq!(self.nodes[child].parent, Some(id), "Inconsistent parent link.");
        }
        if let Some(left) = node.left {
            count += self.assert_subtree_balanced(left, lower, Some(&node.key));
        }
        if let Some(right) = node.right {
            count += self.assert_subtree_balanced(right, Some(&node.key), upper);
        }

        let expected_height = self.height_of(node.left).max(self.height_of(node.right)) + 1;
        assert_eq!(node.height, expected_height, "Outdated height.");
        assert!(self.balance_factor(id).abs() <= 1, "Unbalanced node.");
        count
    }
}

/// Iterator through the entries of an [`AvlTree`] by increasing key order.
pub struct Iter<'a, K, V> {
    tree: &'a AvlTree<K, V>,
    next: Option<usize>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.successor(id);
        self.remaining -= 1;
        Some(self.tree.entry(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
