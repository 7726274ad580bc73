#![forbid(unsafe_code)]
//! A mutable ordered map backed by an AVL tree. Keys are ordered by
//! a comparator, by their own ordering, or by a primitive key derived
//! from them, see `Key` and `Tree`.
//!
//! # Features
//!
//! - `serde`: `Serialize` and `Deserialize` for `Tree` and `Ordered`.
//!   Its tests only build with the feature, run them with
//!   `cargo test --features serde`.

pub(crate) mod avl;
mod error;
mod key;
mod tree;

#[cfg(feature = "serde")]
mod serde_impl;

pub use avl::{Enclosing, Iter, Node, Nodes};
pub use error::{Error, Result};
pub use key::{Key, Ordered, Primitive};
pub use tree::{Options, Tree};
