use core::{iter::FusedIterator, marker::PhantomData, ptr::NonNull};

use crate::{
    node::{links, Dir, Link, Node},
    BalancedTree,
};

/// The order in which a traversal visits the keys of a [`BalancedTree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, arbitrary::Arbitrary)]
pub enum Traversal {
    /// Left subtree, node, right subtree: ascending key order.
    InOrder,
    /// Right subtree, node, left subtree: descending key order.
    ReverseInOrder,
    /// Node, left subtree, right subtree.
    PreOrder,
}

/// An iterator over the keys of a [`BalancedTree`] in a given [`Traversal`] order.
///
/// The iterator holds no stack; it moves between nodes through their child and parent links.
///
/// This `struct` is created by [`BalancedTree::traversal`] and [`BalancedTree::iter`].
pub struct Traverse<'tree, K> {
    next: Link<K>,
    order: Traversal,
    len: usize,
    _tree: PhantomData<&'tree BalancedTree<K>>,
}

impl<'tree, K> Traverse<'tree, K> {
    pub(crate) fn new(tree: &'tree BalancedTree<K>, order: Traversal) -> Self {
        let next = tree.root.map(|root| unsafe {
            match order {
                Traversal::InOrder => extreme(root, Dir::Left),
                Traversal::ReverseInOrder => extreme(root, Dir::Right),
                Traversal::PreOrder => root,
            }
        });

        Traverse {
            next,
            order,
            len: tree.len(),
            _tree: PhantomData,
        }
    }

    /// Returns the order this iterator visits keys in.
    pub fn order(&self) -> Traversal {
        self.order
    }
}

// Returns the outermost node of the subtree at `node` in direction `dir`.
unsafe fn extreme<K>(mut node: NonNull<Node<K>>, dir: Dir) -> NonNull<Node<K>> {
    while let Some(child) = unsafe { links(node).as_ref().child(dir) } {
        node = child;
    }

    node
}

// Returns the in-order neighbour of `node` in direction `dir`: the successor for `Dir::Right`, the
// predecessor for `Dir::Left`.
unsafe fn step_in_order<K>(node: NonNull<Node<K>>, dir: Dir) -> Link<K> {
    unsafe {
        if let Some(child) = links(node).as_ref().child(dir) {
            // Descend into the subtree on that side and take its opposite extreme.
            return Some(extreme(child, !dir));
        }

        // Otherwise ascend until arriving from the opposite side.
        let mut cur = node;
        while let Some(parent) = links(cur).as_ref().parent() {
            if BalancedTree::which_child(parent, cur) == !dir {
                return Some(parent);
            }
            cur = parent;
        }

        None
    }
}

unsafe fn step_pre_order<K>(node: NonNull<Node<K>>) -> Link<K> {
    unsafe {
        let l = links(node).as_ref();
        if let Some(next) = l.left().or(l.right()) {
            return Some(next);
        }

        // `node` is a leaf. Climb until some ancestor reached from its left has a right subtree
        // that has not been visited yet.
        let mut cur = node;
        while let Some(parent) = links(cur).as_ref().parent() {
            if BalancedTree::which_child(parent, cur) == Dir::Left {
                if let Some(right) = links(parent).as_ref().right() {
                    return Some(right);
                }
            }
            cur = parent;
        }

        None
    }
}

impl<'tree, K> Iterator for Traverse<'tree, K> {
    type Item = &'tree K;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;

        self.next = unsafe {
            match self.order {
                Traversal::InOrder => step_in_order(cur, Dir::Right),
                Traversal::ReverseInOrder => step_in_order(cur, Dir::Left),
                Traversal::PreOrder => step_pre_order(cur),
            }
        };
        self.len -= 1;

        Some(unsafe { &(*cur.as_ptr()).key })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K> ExactSizeIterator for Traverse<'_, K> {}

impl<K> FusedIterator for Traverse<'_, K> {}

impl<K> Clone for Traverse<'_, K> {
    fn clone(&self) -> Self {
        Traverse { ..*self }
    }
}

impl<'tree, K> IntoIterator for &'tree BalancedTree<K> {
    type Item = &'tree K;
    type IntoIter = Traverse<'tree, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
