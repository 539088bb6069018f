// Rotations and the bottom-up rebalance walk.
//
// Every node caches its height and its balance factor `height(right) - height(left)`. The cached
// values of a node are only valid once both of its children are valid, so any code that edits
// links refreshes nodes bottom-up: children first, then the node, then its ancestors.

use core::{cmp, ptr::NonNull};

use crate::{
    node::{links, Dir, Link, Node},
    BalancedTree,
};

impl<K> BalancedTree<K> {
    /// Returns the cached height of the subtree at `node`, or -1 if it is absent.
    #[inline]
    pub(crate) unsafe fn height_of(node: Link<K>) -> i8 {
        node.map_or(-1, |n| unsafe { links(n).as_ref().height() })
    }

    // Recomputes the cached height and balance factor of `node` from its children.
    #[inline]
    unsafe fn update(node: NonNull<Node<K>>) {
        unsafe {
            let left = Self::height_of(links(node).as_ref().left());
            let right = Self::height_of(links(node).as_ref().right());

            links(node)
                .as_mut()
                .set_height(cmp::max(left, right) + 1, right - left);
        }
    }

    #[inline]
    pub(crate) unsafe fn maybe_set_parent(opt_node: Link<K>, parent: Link<K>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { links(node).as_mut().set_parent(parent) };
    }

    // Replaces `old_child` with `new_child` in `parent`'s child slot, or makes `new_child` the root
    // if `old_child` had no parent.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // If `parent` is present, `old_child` must be one of its children.
    #[inline]
    pub(crate) unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<K>,
        old_child: NonNull<Node<K>>,
        new_child: Link<K>,
    ) {
        let Some(parent) = parent else {
            self.root = new_child;
            return;
        };

        unsafe {
            let dir = Self::which_child(parent, old_child);
            links(parent).as_mut().set_child(dir, new_child);
        }
    }

    /// Returns which child slot of `parent` holds `child`.
    ///
    /// # Safety
    ///
    /// `child` must be a child of `parent`.
    pub(crate) unsafe fn which_child(parent: NonNull<Node<K>>, child: NonNull<Node<K>>) -> Dir {
        unsafe {
            if links(parent).as_ref().left() == Some(child) {
                Dir::Left
            } else {
                debug_assert_eq!(
                    links(parent).as_ref().right(),
                    Some(child),
                    "`child` must be a child of `parent`"
                );
                Dir::Right
            }
        }
    }

    // Single rotation at `node`, moving it down towards `dir`.
    //
    // The child of `node` on the opposite side (the pivot) takes `node`'s place, `node` becomes the
    // pivot's `dir` child, and the pivot's former `dir` subtree is handed over to `node`. Only
    // links change; no keys are compared. Returns the pivot, the new local subtree root.
    unsafe fn rotate(&mut self, node: NonNull<Node<K>>, dir: Dir) -> NonNull<Node<K>> {
        unsafe {
            let pivot = links(node)
                .as_ref()
                .child(!dir)
                .expect("rotation requires a child on the pivot side");
            let parent = links(node).as_ref().parent();

            // The pivot's inner subtree crosses over to `node`.
            let across = links(pivot).as_ref().child(dir);
            links(node).as_mut().set_child(!dir, across);
            Self::maybe_set_parent(across, Some(node));

            links(pivot).as_mut().set_child(dir, Some(node));
            links(node).as_mut().set_parent(Some(pivot));

            links(pivot).as_mut().set_parent(parent);
            self.replace_child_or_set_root(parent, node, Some(pivot));

            // `node` is now below the pivot, so it settles first.
            Self::update(node);
            Self::update(pivot);

            tracing::trace!(
                ?dir,
                height = links(pivot).as_ref().height(),
                balance = links(pivot).as_ref().balance(),
                "rotated"
            );

            pivot
        }
    }

    /// Single left rotation: `node`'s right child takes its place.
    pub(crate) unsafe fn rotate_left(&mut self, node: NonNull<Node<K>>) -> NonNull<Node<K>> {
        unsafe { self.rotate(node, Dir::Left) }
    }

    /// Single right rotation: `node`'s left child takes its place.
    pub(crate) unsafe fn rotate_right(&mut self, node: NonNull<Node<K>>) -> NonNull<Node<K>> {
        unsafe { self.rotate(node, Dir::Right) }
    }

    /// Rotates `node`'s left child left, then `node` right.
    pub(crate) unsafe fn rotate_left_right(&mut self, node: NonNull<Node<K>>) -> NonNull<Node<K>> {
        unsafe {
            let left = links(node)
                .as_ref()
                .left()
                .expect("left-right rotation requires a left child");
            self.rotate_left(left);
            self.rotate_right(node)
        }
    }

    /// Rotates `node`'s right child right, then `node` left.
    pub(crate) unsafe fn rotate_right_left(&mut self, node: NonNull<Node<K>>) -> NonNull<Node<K>> {
        unsafe {
            let right = links(node)
                .as_ref()
                .right()
                .expect("right-left rotation requires a right child");
            self.rotate_right(right);
            self.rotate_left(node)
        }
    }

    // Restores the balance invariant at `node`, whose children are balanced and carry valid cached
    // heights. Returns the root of the local subtree, which is `node` unless a rotation happened.
    unsafe fn rebalance_at(&mut self, node: NonNull<Node<K>>) -> NonNull<Node<K>> {
        unsafe {
            Self::update(node);

            match links(node).as_ref().balance() {
                -2 => {
                    let left = links(node).as_ref().left();
                    let (outer, inner) = left
                        .map(|l| (links(l).as_ref().left(), links(l).as_ref().right()))
                        .expect("left-heavy node must have a left child");

                    if Self::height_of(outer) >= Self::height_of(inner) {
                        self.rotate_right(node)
                    } else {
                        self.rotate_left_right(node)
                    }
                }

                2 => {
                    let right = links(node).as_ref().right();
                    let (outer, inner) = right
                        .map(|r| (links(r).as_ref().right(), links(r).as_ref().left()))
                        .expect("right-heavy node must have a right child");

                    if Self::height_of(outer) >= Self::height_of(inner) {
                        self.rotate_left(node)
                    } else {
                        self.rotate_right_left(node)
                    }
                }

                balance => {
                    debug_assert!((-1..=1).contains(&balance), "balance out of range: {balance}");
                    node
                }
            }
        }
    }

    /// Walks from `start` up to the root, refreshing cached heights and rotating every node whose
    /// balance factor reached ±2.
    ///
    /// A rotation changes the height of the local subtree, so the walk never stops early; it
    /// continues from the parent of the new local root. The node reached last becomes the root.
    ///
    /// # Safety
    ///
    /// `start` must be a node of this tree, and every subtree hanging off the path from `start` to
    /// the root must already be balanced with valid cached heights.
    pub(crate) unsafe fn rebalance_from(&mut self, start: NonNull<Node<K>>) {
        let mut cur = start;

        loop {
            unsafe {
                let local_root = self.rebalance_at(cur);

                match links(local_root).as_ref().parent() {
                    Some(parent) => cur = parent,
                    None => {
                        self.root = Some(local_root);
                        tracing::trace!(
                            height = links(local_root).as_ref().height(),
                            "rebalanced to root"
                        );
                        return;
                    }
                }
            }
        }
    }
}
