extern crate std;

use std::{ops::Range, prelude::v1::*};

use proptest::prelude::*;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

use crate::model;

use super::*;

// The returned guard keeps the subscriber installed for the current thread until dropped.
fn trace_guard() -> impl Sized {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .set_default()
}

// Returns (key, balance) of the root and its two children.
fn top_shape(tree: &BalancedTree<u32>) -> [Option<(u32, i8)>; 3] {
    fn describe(node: Link<u32>) -> Option<(u32, i8)> {
        node.map(|n| unsafe { (n.as_ref().key, links(n).as_ref().balance()) })
    }

    let root = tree.root;
    let (left, right) = match root {
        Some(r) => unsafe { (links(r).as_ref().left(), links(r).as_ref().right()) },
        None => (None, None),
    };

    [describe(root), describe(left), describe(right)]
}

fn insert_find_all(keys: &[u32]) {
    let mut tree: BalancedTree<u32> = BalancedTree::new();

    for &key in keys {
        assert!(tree.insert(key));
        tree.assert_invariants();
    }

    for key in keys {
        let found = tree.find(key).expect("item not found");
        assert_eq!(found, key);
    }

    assert_eq!(tree.len(), keys.len());
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

// Calls `f` with every permutation of `keys`.
fn for_each_permutation(keys: &mut [u32], k: usize, f: &mut impl FnMut(&[u32])) {
    if k == keys.len() {
        f(keys);
        return;
    }

    for i in k..keys.len() {
        keys.swap(k, i);
        for_each_permutation(keys, k + 1, f);
        keys.swap(k, i);
    }
}

#[test]
fn five_elems_find() {
    for_each_permutation(&mut [0, 1, 2, 3, 4], 0, &mut |keys| insert_find_all(keys));
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: BalancedTree<u32> = BalancedTree::new();

    for &key in keys {
        tree.insert(key);
        tree.assert_invariants();
    }

    for key in keys {
        assert!(tree.remove(key), "item not found");
        tree.assert_invariants();
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(key);
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        assert!(tree.remove(key), "item not found");
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_six() {
    for_each_permutation(&mut [0, 1, 2, 3, 4, 5], 0, &mut |keys| insert_remove_all(keys));
}

#[test]
fn ascending_inserts_rotate_left() {
    let _trace = trace_guard();
    let mut tree = BalancedTree::new();

    tree.insert(10);
    tree.insert(20);
    tree.insert(30);

    tree.assert_invariants();
    assert_eq!(
        top_shape(&tree),
        [Some((20, 0)), Some((10, 0)), Some((30, 0))]
    );
    assert_eq!(tree.traverse(Traversal::InOrder), [&10, &20, &30]);
}

#[test]
fn descending_inserts_rotate_right() {
    let mut tree = BalancedTree::new();

    tree.extend([30, 20, 10]);

    tree.assert_invariants();
    assert_eq!(
        top_shape(&tree),
        [Some((20, 0)), Some((10, 0)), Some((30, 0))]
    );
}

#[test]
fn zig_zag_inserts_rotate_twice() {
    let left_right: BalancedTree<u32> = [30, 10, 20].into_iter().collect();
    let right_left: BalancedTree<u32> = [10, 30, 20].into_iter().collect();

    for tree in [left_right, right_left] {
        tree.assert_invariants();
        assert_eq!(
            top_shape(&tree),
            [Some((20, 0)), Some((10, 0)), Some((30, 0))]
        );
    }
}

#[test]
fn remove_two_child_node_reuses_it_for_successor() {
    let _trace = trace_guard();
    let mut tree: BalancedTree<u32> = [5, 2, 8, 1, 3, 7, 9, 4].into_iter().collect();
    tree.assert_invariants();

    let two = tree.get_raw(&2).unwrap();
    let three = tree.get_raw(&3).unwrap();

    assert!(tree.remove(&2));
    tree.assert_invariants();

    // The node that held 2 now holds its successor 3; the successor's node is gone.
    assert_eq!(tree.get_raw(&3), Some(two));
    assert_ne!(tree.get_raw(&3), Some(three));
    assert!(!tree.contains(&2));
    assert_eq!(tree.len(), 7);
    assert_eq!(
        tree.traverse(Traversal::InOrder),
        [&1, &3, &4, &5, &7, &8, &9]
    );

    unsafe {
        // 4 was spliced into the successor's slot.
        let four = links(two).as_ref().right().unwrap();
        assert_eq!(four.as_ref().key, 4);
        assert_eq!(links(four).as_ref().parent(), Some(two));
    }
}

#[test]
fn remove_root_with_single_child() {
    let mut tree = BalancedTree::new();
    tree.insert(1);
    tree.insert(2);

    assert_eq!(tree.take(&1), Some(1));
    tree.assert_invariants();
    assert_eq!(top_shape(&tree), [Some((2, 0)), None, None]);

    assert!(tree.remove(&2));
    tree.assert_invariants();
    assert!(tree.is_empty());
    assert_eq!(top_shape(&tree), [None, None, None]);
}

#[test]
fn remove_rebalances_up_to_root() {
    // Removing 12 leaves 11 left-heavy by two, which forces a rotation below the root.
    let mut tree: BalancedTree<u32> = [8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 1, 9]
        .into_iter()
        .collect();
    tree.assert_invariants();

    for key in [12, 9, 10] {
        assert!(tree.remove(&key));
        tree.assert_invariants();
    }

    assert_eq!(
        tree.traverse(Traversal::InOrder),
        [&1, &2, &3, &4, &5, &6, &7, &8, &11]
    );
}

#[test]
fn duplicate_insert_is_noop() {
    let mut tree: BalancedTree<u32> = [4, 2, 6].into_iter().collect();
    let before: Vec<u32> = tree.traverse(Traversal::PreOrder).into_iter().copied().collect();

    assert!(!tree.insert(2));
    assert_eq!(tree.try_insert(6), Err(DuplicateKey(6)));
    tree.assert_invariants();

    assert_eq!(tree.len(), 3);
    assert!(tree.traverse(Traversal::PreOrder).into_iter().copied().eq(before));
}

#[test]
fn remove_absent_is_noop() {
    let mut tree: BalancedTree<u32> = [4, 2, 6].into_iter().collect();

    assert!(!tree.remove(&5));
    assert_eq!(tree.take(&0), None);
    tree.assert_invariants();
    assert_eq!(tree.len(), 3);

    let mut empty: BalancedTree<u32> = BalancedTree::new();
    assert!(!empty.remove(&1));
    assert!(empty.is_empty());
}

#[test]
fn find_returns_stored_instance() {
    // Ordering only looks at the id, so the stored label is observable through `find`.
    #[derive(Debug)]
    struct Tagged {
        id: u32,
        label: &'static str,
    }

    impl PartialEq for Tagged {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl Eq for Tagged {}

    impl PartialOrd for Tagged {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    impl Ord for Tagged {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    let mut tree = BalancedTree::new();
    tree.insert(Tagged { id: 1, label: "stored" });

    let dup = tree.try_insert(Tagged { id: 1, label: "rejected" }).unwrap_err();
    assert_eq!(dup.into_key().label, "rejected");

    let probe = Tagged { id: 1, label: "probe" };
    assert_eq!(tree.find(&probe).map(|t| t.label), Some("stored"));
    assert_eq!(tree.take(&probe).map(|t| t.label), Some("stored"));
}

#[test]
fn borrowed_lookup() {
    let mut tree: BalancedTree<String> = ["pear", "apple", "fig"]
        .into_iter()
        .map(String::from)
        .collect();

    assert!(tree.contains("fig"));
    assert_eq!(tree.find("apple").map(String::as_str), Some("apple"));
    assert!(tree.remove("pear"));
    assert_eq!(tree.first().map(String::as_str), Some("apple"));
    assert_eq!(tree.last().map(String::as_str), Some("fig"));
}

#[test]
fn pop_first_and_last() {
    let mut tree: BalancedTree<u32> = (0..32).collect();

    assert_eq!(tree.pop_first(), Some(0));
    assert_eq!(tree.pop_last(), Some(31));
    tree.assert_invariants();
    assert_eq!(tree.first(), Some(&1));
    assert_eq!(tree.last(), Some(&30));
    assert_eq!(tree.len(), 30);

    let mut empty: BalancedTree<u32> = BalancedTree::new();
    assert_eq!(empty.pop_first(), None);
    assert_eq!(empty.pop_last(), None);
}

#[test]
fn clear_drops_all_keys() {
    use std::rc::Rc;

    let marker = Rc::new(());
    let mut tree = BalancedTree::new();

    for i in 0..100u32 {
        tree.insert((i, Rc::clone(&marker)));
    }
    assert_eq!(Rc::strong_count(&marker), 101);

    tree.clear();
    tree.assert_invariants();
    assert!(tree.is_empty());
    assert_eq!(Rc::strong_count(&marker), 1);

    // The tree is reusable after clearing.
    tree.insert((7, Rc::clone(&marker)));
    drop(tree);
    assert_eq!(Rc::strong_count(&marker), 1);
}

#[test]
fn height_stays_logarithmic() {
    let tree: BalancedTree<u32> = (0..1024).collect();
    tree.assert_invariants();

    // An AVL tree with n nodes is at most ~1.44 log2(n) tall.
    let height = unsafe { BalancedTree::height_of(tree.root) };
    assert!(height <= 14, "height {height} too large");
}

#[test]
fn debug_lists_keys_in_order() {
    let tree: BalancedTree<u32> = [3, 1, 2].into_iter().collect();
    assert_eq!(std::format!("{tree:?}"), "{1, 2, 3}");
}

#[test]
fn model_pre_order_after_rotations() {
    use model::{ItemValue, Op};

    // Ascending inserts rotate on the way, then removing 4 splices its successor.
    let mut ops: Vec<Op> = (1..=7).map(|k| Op::Insert(ItemValue::Random(k))).collect();
    ops.push(Op::Traverse(Traversal::PreOrder));
    ops.push(Op::Remove(ItemValue::Random(4)));
    ops.push(Op::Traverse(Traversal::PreOrder));
    ops.push(Op::PopFirst);
    ops.push(Op::Traverse(Traversal::PreOrder));

    model::run_btree_equivalence(ops);
}

#[test]
fn pre_order_of_rotated_tree() {
    let tree: BalancedTree<u32> = (1..=7).collect();

    assert_eq!(
        tree.traverse(Traversal::PreOrder),
        [&4, &2, &1, &3, &6, &5, &7]
    );
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn reverse_in_order_mirrors_in_order(keys in proptest::collection::vec(any::<u16>(), 0..200)) {
        let tree: BalancedTree<u16> = keys.into_iter().collect();

        let mut forward = tree.traverse(Traversal::InOrder);
        forward.reverse();
        prop_assert_eq!(forward, tree.traverse(Traversal::ReverseInOrder));
    }

    #[test]
    fn size_conservation(
        keys in proptest::collection::btree_set(any::<u32>(), 0..200),
        stride in 1usize..5,
    ) {
        let keys: Vec<u32> = keys.into_iter().collect();
        let mut tree: BalancedTree<u32> = keys.iter().copied().collect();

        let removed: Vec<u32> = keys.iter().copied().step_by(stride).collect();
        for key in &removed {
            prop_assert!(tree.remove(key));
            tree.assert_invariants();
        }

        prop_assert_eq!(tree.traverse(Traversal::InOrder).len(), keys.len() - removed.len());
        prop_assert_eq!(tree.len(), keys.len() - removed.len());
    }

    #[test]
    fn insert_find_remove_round_trip(keys in proptest::collection::vec(any::<u32>(), 1..100)) {
        let mut tree: BalancedTree<u32> = BalancedTree::new();

        for key in &keys {
            tree.insert(*key);
            prop_assert_eq!(tree.find(key), Some(key));
        }

        for key in &keys {
            tree.remove(key);
            prop_assert_eq!(tree.find(key), None);
            tree.assert_invariants();
        }

        prop_assert!(tree.is_empty());
    }

    #[test]
    fn pre_order_rebuild_keeps_keys(keys in proptest::collection::vec(any::<u8>(), 0..100)) {
        let tree: BalancedTree<u8> = keys.iter().copied().collect();
        let rebuilt: BalancedTree<u8> = tree
            .traverse(Traversal::PreOrder)
            .into_iter()
            .copied()
            .collect();

        rebuilt.assert_invariants();
        prop_assert!(tree.iter().eq(rebuilt.iter()));
    }
}
