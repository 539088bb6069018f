/// The error returned by [`BalancedTree::try_insert`](crate::BalancedTree::try_insert) when an equal
/// key is already stored in the tree.
///
/// The rejected key is handed back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("an equal key is already present in the tree")]
pub struct DuplicateKey<K>(pub K);

impl<K> DuplicateKey<K> {
    /// Returns the key that was rejected.
    pub fn into_key(self) -> K {
        self.0
    }
}
