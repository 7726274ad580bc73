//! A tree is written as its root node, each node as
//! `{ key, value, height, left, right }`, so reading it back rebuilds
//! exactly the same shape. The comparator and converter are not
//! written, a tree that needs them must be given them again.
//!
//! Reading checks the cached heights and the balance of every node.
//! When the keys order themselves, or convert to a `Primitive`, their
//! order is checked too, so such a tree must have been written in that
//! order.

use crate::{
    avl::{Link, Node, Nodes},
    key::{Key, Order},
    tree::Tree,
};
use serde::{
    de::{Deserialize, Deserializer, Error},
    ser::{Serialize, Serializer},
};
use std::cmp::Ordering;
use tracing::debug;

impl<K, V> Serialize for Tree<K, V>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}

fn check_order<K: Key, V>(root: &Node<K, V>) -> Result<(), String> {
    // without a comparator some trees can't be checked
    let order = match Order::resolve(root.key(), None, None) {
        None => return Ok(()),
        Some(order) => order,
    };
    let mut prev: Option<&K> = None;
    for (i, n) in Nodes::new(Some(root), true).enumerate() {
        if let Some(p) = prev {
            if order.compare(p, n.key()) != Ordering::Less {
                return Err(format!("keys out of order at position {}", i));
            }
        }
        prev = Some(n.key());
    }
    Ok(())
}

impl<'de, K, V> Deserialize<'de> for Tree<K, V>
where
    K: Key + Deserialize<'de>,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let root = Link::<K, V>::deserialize(deserializer)?;
        if let Some(root) = root.as_deref() {
            root.check_shape()
                .map(|_| ())
                .and_then(|()| check_order(root))
                .map_err(|e| {
                    debug!(error = %e, "rejecting serialized tree");
                    D::Error::custom(e)
                })?;
        }
        Ok(Tree::from_root(root))
    }
}
