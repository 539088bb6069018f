#![no_main]

use cordyceps_avl::{BalancedTree, Traversal};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (Vec<u16>, Vec<u16>)| {
    let (inserts, removes) = input;

    let mut tree: BalancedTree<u16> = inserts.into_iter().collect();
    for key in &removes {
        tree.remove(key);
    }
    tree.assert_invariants();

    let mut forward = tree.traverse(Traversal::InOrder);
    assert!(forward.windows(2).all(|w| w[0] < w[1]));

    forward.reverse();
    assert_eq!(forward, tree.traverse(Traversal::ReverseInOrder));
    assert_eq!(tree.traverse(Traversal::PreOrder).len(), tree.len());
});
