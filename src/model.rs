//! A reference model for [`BalancedTree`]: random operation sequences replayed against
//! [`BTreeSet`], shared by the property tests and the fuzz harness.

extern crate std;

use std::{
    collections::{BTreeMap, BTreeSet},
    prelude::v1::*,
};

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::{
    node::{links, Link},
    BalancedTree, Traversal,
};

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    /// Picks a key already in the tree, so removals and duplicate inserts actually hit.
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

fn traversal_strategy() -> impl Strategy<Value = Traversal> {
    proptest::prop_oneof![
        Just(Traversal::InOrder),
        Just(Traversal::ReverseInOrder),
        Just(Traversal::PreOrder),
    ]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Find(ItemValue),
    Remove(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
    Traverse(Traversal),
    Clear,
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => match v.len() {
                    0 => u32::try_from(idx).unwrap_or(u32::MAX),
                    len => v[idx % len],
                },
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(sorted, item)),
            Op::Find(item) => FinalOp::Find(get_value(sorted, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
            Op::Traverse(order) => FinalOp::Traverse(order),
            Op::Clear => FinalOp::Clear,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Find(u32),
    Remove(u32),
    First,
    PopFirst,
    Last,
    PopLast,
    Traverse(Traversal),
    Clear,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    // Clearing is rare so that trees get a chance to grow.
    proptest::prop_oneof![
        4 => value_strategy().prop_map(Op::Insert),
        2 => value_strategy().prop_map(Op::Find),
        3 => value_strategy().prop_map(Op::Remove),
        1 => Just(Op::First),
        1 => Just(Op::PopFirst),
        1 => Just(Op::Last),
        1 => Just(Op::PopLast),
        1 => traversal_strategy().prop_map(Op::Traverse),
        1 => Just(Op::Clear),
    ]
}

// Pre-order of the linked structure, walked recursively instead of through parent links.
fn linked_pre_order(node: Link<u32>, out: &mut Vec<u32>) {
    let Some(node) = node else {
        return;
    };

    unsafe {
        out.push(node.as_ref().key);
        linked_pre_order(links(node).as_ref().left(), out);
        linked_pre_order(links(node).as_ref().right(), out);
    }
}

impl BalancedTree<u32> {
    fn parent_key(&self, key: &u32) -> Option<&u32> {
        let node = self.get_raw(key)?;
        unsafe {
            links(node)
                .as_ref()
                .parent()
                .map(|parent| &(*parent.as_ptr()).key)
        }
    }
}

/// Replays `ops` against both a [`BalancedTree`] and a [`BTreeSet`], panicking on the first
/// divergence or broken tree invariant.
pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut sorted_values = Vec::with_capacity(ops.len());
    let mut btree = BTreeSet::new();
    let mut avl: BalancedTree<u32> = BalancedTree::new();

    fn insert_sorted(v: &mut Vec<u32>, value: u32) {
        if let Err(idx) = v.binary_search(&value) {
            v.insert(idx, value);
        }
    }

    fn remove_sorted(v: &mut Vec<u32>, value: u32) {
        if let Ok(idx) = v.binary_search(&value) {
            v.remove(idx);
        }
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted_values);

        match final_op {
            FinalOp::Insert(value) => {
                insert_sorted(&mut sorted_values, value);

                assert_eq!(btree.insert(value), avl.insert(value), "Op #{op_id}: {op:?}");
            }

            FinalOp::Find(value) => {
                assert_eq!(btree.get(&value), avl.find(&value), "Op #{op_id}: {op:?}");
                assert_eq!(
                    btree.contains(&value),
                    avl.contains(&value),
                    "Op #{op_id}: {op:?}"
                );
            }

            FinalOp::Remove(value) => {
                remove_sorted(&mut sorted_values, value);

                assert_eq!(btree.take(&value), avl.take(&value), "Op #{op_id}: {op:?}");
            }

            FinalOp::First => {
                assert_eq!(btree.first(), avl.first(), "Op #{op_id}: {op:?}");
            }

            FinalOp::PopFirst => {
                if let Some(v) = btree.first() {
                    remove_sorted(&mut sorted_values, *v);
                }

                assert_eq!(btree.pop_first(), avl.pop_first(), "Op #{op_id}: {op:?}");
            }

            FinalOp::Last => {
                assert_eq!(btree.last(), avl.last(), "Op #{op_id}: {op:?}");
            }

            FinalOp::PopLast => {
                if let Some(v) = btree.last() {
                    remove_sorted(&mut sorted_values, *v);
                }

                assert_eq!(btree.pop_last(), avl.pop_last(), "Op #{op_id}: {op:?}");
            }

            FinalOp::Traverse(order) => {
                let from_avl = avl.traverse(order);
                assert_eq!(from_avl.len(), btree.len(), "Op #{op_id}: {op:?}");

                match order {
                    Traversal::InOrder => {
                        assert!(btree.iter().eq(from_avl), "Op #{op_id}: {op:?}");
                    }
                    Traversal::ReverseInOrder => {
                        assert!(btree.iter().rev().eq(from_avl), "Op #{op_id}: {op:?}");
                    }
                    Traversal::PreOrder => {
                        let mut expected = Vec::with_capacity(avl.len());
                        linked_pre_order(avl.root, &mut expected);
                        assert!(
                            from_avl.iter().copied().eq(expected.iter()),
                            "Op #{op_id}: {op:?}"
                        );

                        // Every key but the root comes after its parent.
                        let position: BTreeMap<u32, usize> = from_avl
                            .iter()
                            .enumerate()
                            .map(|(i, key)| (**key, i))
                            .collect();
                        for (i, key) in from_avl.iter().enumerate() {
                            let parent = avl.parent_key(key);
                            match parent {
                                Some(parent) => {
                                    assert!(position[parent] < i, "Op #{op_id}: {op:?}")
                                }
                                None => assert_eq!(i, 0, "Op #{op_id}: {op:?}"),
                            }
                        }
                    }
                }
            }

            FinalOp::Clear => {
                sorted_values.clear();
                btree.clear();
                avl.clear();
            }
        }

        avl.assert_invariants();
        assert_eq!(btree.len(), avl.len());
        assert_eq!(btree.is_empty(), avl.is_empty());
        assert!(btree.iter().eq(avl.iter()));
    }
}
