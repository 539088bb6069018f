use cordyceps_avl::{BalancedTree, Traversal};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut tree: BalancedTree<u32> = BalancedTree::new();

    // Right-leaning inserts: the third one rotates 10 down to the left of 20.
    for key in [10, 20, 30] {
        tree.insert(key);
        tree.assert_invariants();
        println!("insert {key}: {:?}", tree.traverse(Traversal::PreOrder));
    }

    tree.clear();

    for key in [5, 2, 8, 1, 3, 7, 9, 4] {
        tree.insert(key);
        tree.assert_invariants();
    }
    println!("pre-order: {:?}", tree.traverse(Traversal::PreOrder));

    // 2 has two children; its successor 3 takes its place.
    tree.remove(&2);
    tree.assert_invariants();
    println!("remove 2, in-order: {:?}", tree.traverse(Traversal::InOrder));
    println!(
        "remove 2, reverse: {:?}",
        tree.traverse(Traversal::ReverseInOrder)
    );

    let first = tree.pop_first();
    assert_eq!(first, Some(1));
    tree.assert_invariants();

    drop(tree);
}
