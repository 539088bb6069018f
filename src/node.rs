use alloc::boxed::Box;
use core::{cell::UnsafeCell, marker::PhantomPinned, mem, ops::Not, ptr::NonNull};

use cordyceps::Linked;

pub(crate) type Link<K> = Option<NonNull<Node<K>>>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// A heap node owned by a [`BalancedTree`](crate::BalancedTree).
///
/// The tree owns every node through the raw pointers in its links; a node is
/// reclaimed by converting its pointer back into a `Box` with [`Linked::from_ptr`].
#[repr(C)]
pub(crate) struct Node<K> {
    links: Links<Node<K>>,
    pub(crate) key: K,
}

pub(crate) struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    // Non-owning back-reference, never used to decide lifetime.
    parent: Option<NonNull<T>>,
    children: [Option<NonNull<T>>; 2],
    // Height of the subtree rooted here. Leaves are 0, absent subtrees -1.
    height: i8,
    // height(right) - height(left).
    balance: i8,
    _unpin: PhantomPinned,
}

impl<K> Node<K> {
    pub(crate) fn new(key: K) -> Box<Node<K>> {
        Box::new(Node {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl<K> Linked<Links<Node<K>>> for Node<K> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Node<K>>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

/// Returns a pointer to the links of `node`.
///
/// # Safety
///
/// `node` must point to a live node.
#[inline]
pub(crate) unsafe fn links<K>(node: NonNull<Node<K>>) -> NonNull<Links<Node<K>>> {
    unsafe { <Node<K> as Linked<Links<Node<K>>>>::links(node) }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 0,
                balance: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    #[cfg_attr(not(feature = "dot"), allow(dead_code))]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    pub(crate) fn height(&self) -> i8 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    pub(crate) fn balance(&self) -> i8 {
        unsafe { (*self.inner.get()).balance }
    }

    #[inline]
    pub(crate) fn parent(&self) -> Option<NonNull<T>> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    pub(crate) fn child(&self, dir: Dir) -> Option<NonNull<T>> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    pub(crate) fn left(&self) -> Option<NonNull<T>> {
        self.child(Dir::Left)
    }

    #[inline]
    pub(crate) fn right(&self) -> Option<NonNull<T>> {
        self.child(Dir::Right)
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Option<NonNull<T>>) -> Option<NonNull<T>> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    pub(crate) fn set_child(
        &mut self,
        dir: Dir,
        child: Option<NonNull<T>>,
    ) -> Option<NonNull<T>> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    pub(crate) fn set_height(&mut self, height: i8, balance: i8) {
        let inner = self.inner.get_mut();
        inner.height = height;
        inner.balance = balance;
    }
}
