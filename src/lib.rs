//! An AVL tree whose nodes keep a parent back-reference.
//!
//! [`BalancedTree`] is an ordered set. After every insertion and removal it restores the AVL
//! invariant by walking from the edited node up to the root, rotating any node whose subtrees
//! differ in height by two.
#![no_std]

// Conventions used in comments:
// - The height of an absent subtree is -1; a leaf has height 0.
// - The balance factor of a node `x` is `height(right(x)) - height(left(x))`.
// - A node is left-heavy (right-heavy) if its balance factor is negative (positive).
//
// The invariants of the tree, which hold whenever no public method is running:
// 1. In-order traversal yields strictly ascending keys.
// 2. Every balance factor is -1, 0 or 1.
// 3. If `c` is a child of `p`, then `c`'s parent link is `p`. The root has no parent.
// 4. Cached heights and balance factors agree with the structure below each node.
// 5. `len` is the number of nodes reachable from the root.

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

use alloc::vec::Vec;
use core::{borrow::Borrow, cmp::Ordering, fmt, ptr, ptr::NonNull};

use cordyceps::Linked;

mod balance;
#[cfg(feature = "dot")]
mod debug;
mod error;
mod iter;
mod node;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use error::DuplicateKey;
pub use iter::{Traversal, Traverse};

use node::{links, Dir, Link, Node};

/// An ordered set of keys stored in an AVL tree.
///
/// Insertion, removal and lookup complete in _O(log(n))_ time. Keys are compared through their
/// [`Ord`] implementation; an inconsistent ordering leaves the tree in an unspecified (but memory
/// safe) state.
pub struct BalancedTree<K> {
    root: Link<K>,
    len: usize,
}

// SAFETY: The tree exclusively owns its nodes, exactly like a `Box<K>` would.
unsafe impl<K: Send> Send for BalancedTree<K> {}

// SAFETY: Shared access only hands out `&K`.
unsafe impl<K: Sync> Sync for BalancedTree<K> {}

impl<K> BalancedTree<K> {
    /// Returns a new empty tree.
    pub const fn new() -> BalancedTree<K> {
        BalancedTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no keys.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of keys in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Clears the tree, dropping all keys.
    ///
    /// This does not rebalance and uses no auxiliary memory.
    pub fn clear(&mut self) {
        if self.len > 0 {
            tracing::debug!(len = self.len, "clearing tree");
        }

        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = Self::min_in_subtree(cur);
                let parent = links(cur).as_ref().parent();
                let right = links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                self.replace_child_or_set_root(parent, cur, right);
                Self::maybe_set_parent(right, parent);

                drop(Node::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Returns the minimum node in the subtree rooted at `root`.
    #[inline]
    unsafe fn min_in_subtree(root: NonNull<Node<K>>) -> NonNull<Node<K>> {
        let mut cur = root;

        while let Some(left) = unsafe { links(cur).as_ref().left() } {
            cur = left;
        }

        cur
    }

    unsafe fn max_in_subtree(root: NonNull<Node<K>>) -> NonNull<Node<K>> {
        let mut cur = root;

        while let Some(right) = unsafe { links(cur).as_ref().right() } {
            cur = right;
        }

        cur
    }

    /// Returns the minimum key in the tree.
    pub fn first(&self) -> Option<&K> {
        let root = self.root?;
        unsafe { Some(&(*Self::min_in_subtree(root).as_ptr()).key) }
    }

    /// Returns the maximum key in the tree.
    pub fn last(&self) -> Option<&K> {
        let root = self.root?;
        unsafe { Some(&(*Self::max_in_subtree(root).as_ptr()).key) }
    }

    /// Removes and returns the minimum key in the tree.
    pub fn pop_first(&mut self) -> Option<K> {
        let root = self.root?;
        unsafe {
            let first = Self::min_in_subtree(root);
            Some(self.remove_at(first))
        }
    }

    /// Removes and returns the maximum key in the tree.
    pub fn pop_last(&mut self) -> Option<K> {
        let root = self.root?;
        unsafe {
            let last = Self::max_in_subtree(root);
            Some(self.remove_at(last))
        }
    }

    /// Returns an iterator over the keys of the tree in the given order.
    ///
    /// The tree cannot be modified while the iterator is alive.
    pub fn traversal(&self, order: Traversal) -> Traverse<'_, K> {
        Traverse::new(self, order)
    }

    /// Returns an iterator over the keys of the tree in ascending order.
    pub fn iter(&self) -> Traverse<'_, K> {
        self.traversal(Traversal::InOrder)
    }

    /// Collects the keys of the tree in the given order.
    pub fn traverse(&self, order: Traversal) -> Vec<&K> {
        self.traversal(order).collect()
    }

    // Unlinks `node` from the tree and returns the key it held.
    //
    // If `node` has two children, its key is exchanged with its in-order successor's and the
    // successor node is unlinked instead. Either way the unlinked node (the victim) has at most
    // one child, which is spliced into the victim's place. The walk then rebalances from the
    // victim's former parent.
    //
    // # Safety
    //
    // `node` must be a node of this tree.
    unsafe fn remove_at(&mut self, node: NonNull<Node<K>>) -> K {
        unsafe {
            let victim = match (links(node).as_ref().left(), links(node).as_ref().right()) {
                (Some(_), Some(right)) => {
                    // The successor is the leftmost node of the right subtree and by
                    // construction has no left child.
                    let successor = Self::min_in_subtree(right);
                    ptr::swap(
                        ptr::addr_of_mut!((*node.as_ptr()).key),
                        ptr::addr_of_mut!((*successor.as_ptr()).key),
                    );

                    tracing::trace!("unlinking in-order successor");
                    successor
                }

                _ => node,
            };

            let parent = links(victim).as_ref().parent();
            let child = {
                let l = links(victim).as_ref();
                debug_assert!(l.left().is_none() || l.right().is_none());
                l.left().or(l.right())
            };

            Self::maybe_set_parent(child, parent);
            self.replace_child_or_set_root(parent, victim, child);
            self.len -= 1;

            // With no parent the victim was the root, and its only child (if any) is a leaf that
            // is now the root. A single node or an empty tree is balanced.
            if let Some(parent) = parent {
                self.rebalance_from(parent);
            }

            Node::from_ptr(victim).key
        }
    }
}

impl<K: Ord> BalancedTree<K> {
    /// Inserts `key` into the tree.
    ///
    /// Returns `false`, dropping `key` and leaving the tree untouched, if an equal key is already
    /// present.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, key: K) -> bool {
        self.try_insert(key).is_ok()
    }

    /// Inserts `key` into the tree, or returns it inside an error if an equal key is already
    /// present.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateKey`] holding `key` if the tree already contains an equal key.
    pub fn try_insert(&mut self, key: K) -> Result<(), DuplicateKey<K>> {
        let Some(root) = self.root else {
            // Tree is empty. The new node becomes the root.
            self.root = Some(Node::into_ptr(Node::new(key)));
            self.len += 1;
            return Ok(());
        };

        let mut parent = root;

        // Descend the tree, looking for an empty slot.
        let dir = loop {
            let dir = match key.cmp(unsafe { &parent.as_ref().key }) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => {
                    tracing::trace!("duplicate key rejected");
                    return Err(DuplicateKey(key));
                }
                Ordering::Greater => Dir::Right,
            };

            match unsafe { links(parent).as_ref().child(dir) } {
                Some(child) => parent = child,
                None => break dir,
            }
        };

        let ptr = Node::into_ptr(Node::new(key));

        unsafe {
            links(ptr).as_mut().set_parent(Some(parent));
            links(parent).as_mut().set_child(dir, Some(ptr));

            self.len += 1;
            self.rebalance_from(parent);
        }

        Ok(())
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key.borrow()) {
                    Ordering::Less => opt_cur = links(cur).as_ref().left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = links(cur).as_ref().right(),
                }
            }
        }
    }

    /// Returns a reference to the stored key equal to `key`.
    ///
    /// The stored key may differ from `key` in ways its ordering ignores.
    pub fn find<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(&(*ptr.as_ptr()).key) }
    }

    /// Returns `true` if the tree contains a key equal to `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Removes the key equal to `key`. Returns whether such a key was present.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.take(key).is_some()
    }

    /// Removes and returns the stored key equal to `key`, if any.
    pub fn take<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(node) = self.get_raw(key) else {
            tracing::trace!("key to remove is absent");
            return None;
        };

        unsafe { Some(self.remove_at(node)) }
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree with nonzero length");
            return;
        };

        unsafe {
            assert_eq!(
                links(root).as_ref().parent(),
                None,
                "root has a parent pointer"
            );

            let mut count = 0;
            self.assert_invariants_at(root, None, None, &mut count);
            assert_eq!(count, self.len, "node count does not match length");
        }
    }

    // Checks the subtree at `node`, whose keys must lie strictly between `lower` and `upper`.
    // Returns the height of the subtree.
    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(
        &self,
        node: NonNull<Node<K>>,
        lower: Option<&K>,
        upper: Option<&K>,
        count: &mut usize,
    ) -> i8 {
        unsafe {
            *count += 1;
            let key = &(*node.as_ptr()).key;

            if let Some(lower) = lower {
                assert!(lower < key, "keys out of order");
            }
            if let Some(upper) = upper {
                assert!(key < upper, "keys out of order");
            }

            let mut heights = [-1i8; 2];
            for dir in [Dir::Left, Dir::Right] {
                let Some(child) = links(node).as_ref().child(dir) else {
                    continue;
                };

                // Ensure child's parent link points to this node.
                let parent = links(child)
                    .as_ref()
                    .parent()
                    .expect("child parent pointer not set");
                assert_eq!(node, parent, "child parent pointer is stale");

                let (lower, upper) = match dir {
                    Dir::Left => (lower, Some(key)),
                    Dir::Right => (Some(key), upper),
                };
                heights[dir as usize] = self.assert_invariants_at(child, lower, upper, count);
            }

            let [left, right] = heights;
            let balance = right - left;
            let height = left.max(right) + 1;

            assert!((-1..=1).contains(&balance), "node out of balance: {balance}");
            assert_eq!(links(node).as_ref().balance(), balance, "stale balance factor");
            assert_eq!(links(node).as_ref().height(), height, "stale height");

            height
        }
    }
}

impl<K> Drop for BalancedTree<K> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K> Default for BalancedTree<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for BalancedTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: Ord> Extend<K> for BalancedTree<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord> FromIterator<K> for BalancedTree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = BalancedTree::new();
        tree.extend(iter);
        tree
    }
}
