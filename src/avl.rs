use arrayvec::ArrayVec;
use std::{
    cmp::{max, Ordering},
    iter::FusedIterator,
    mem::swap,
};
use tracing::trace;

// an AVL tree of height 128 holds more than 2^88 nodes
const MAX_DEPTH: usize = 128;

pub(crate) type Link<K, V> = Option<Box<Node<K, V>>>;

/// A single binding in a `Tree`. Nodes are heap allocated once, on
/// the first insert of their key, and afterwards only ever change
/// place in the tree, so a node's address is its identity.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node<K, V> {
    key: K,
    value: V,
    height: u16,
    left: Link<K, V>,
    right: Link<K, V>,
}

fn height<K, V>(l: &Link<K, V>) -> u16 {
    match l {
        None => 0,
        Some(n) => n.height,
    }
}

/// The nearest bindings around a key, see `Tree::enclosing_nodes`
#[derive(Debug)]
pub struct Enclosing<'a, K, V> {
    /// the greatest node with a key less than or equal to the query
    pub last: Option<&'a Node<K, V>>,
    /// the smallest node with a key greater than or equal to the query
    pub first: Option<&'a Node<K, V>>,
}

impl<'a, K, V> Clone for Enclosing<'a, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, K, V> Copy for Enclosing<'a, K, V> {}

impl<K, V> Node<K, V> {
    pub(crate) fn new(key: K, value: V) -> Self {
        Node {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// the height of the subtree rooted here, a leaf has height 1
    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn left(&self) -> Option<&Node<K, V>> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Node<K, V>> {
        self.right.as_deref()
    }

    pub(crate) fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub(crate) fn set_key(&mut self, key: K) {
        self.key = key
    }

    pub(crate) fn into_entry(self: Box<Self>) -> (K, V) {
        let Node { key, value, .. } = *self;
        (key, value)
    }

    fn update_height(&mut self) {
        self.height = 1 + max(height(&self.left), height(&self.right));
    }

    pub(crate) fn first(&self) -> &Self {
        let mut n = self;
        while let Some(l) = n.left.as_deref() {
            n = l
        }
        n
    }

    pub(crate) fn last(&self) -> &Self {
        let mut n = self;
        while let Some(r) = n.right.as_deref() {
            n = r
        }
        n
    }

    fn rotate_right(mut self: Box<Self>) -> Box<Self> {
        let Some(mut root) = self.left.take() else {
            return self;
        };
        self.left = root.right.take();
        self.update_height();
        root.right = Some(self);
        root.update_height();
        root
    }

    fn rotate_left(mut self: Box<Self>) -> Box<Self> {
        let Some(mut root) = self.right.take() else {
            return self;
        };
        self.right = root.left.take();
        self.update_height();
        root.left = Some(self);
        root.update_height();
        root
    }

    /// restore the balance of this subtree, assuming both children
    /// are balanced and their heights differ by at most 2. When the
    /// inner and outer grandchildren are equally tall a single
    /// rotation is used.
    fn rebalance(mut self: Box<Self>) -> Box<Self> {
        let (hl, hr) = (height(&self.left), height(&self.right));
        if hl > hr + 1 {
            let single = match self.left.as_deref() {
                None => true,
                Some(l) => height(&l.left) >= height(&l.right),
            };
            if !single {
                trace!(left = hl, right = hr, "left-right rotation");
                self.left = self.left.take().map(Node::rotate_left);
            } else {
                trace!(left = hl, right = hr, "right rotation");
            }
            self.rotate_right()
        } else if hr > hl + 1 {
            let single = match self.right.as_deref() {
                None => true,
                Some(r) => height(&r.right) >= height(&r.left),
            };
            if !single {
                trace!(left = hl, right = hr, "right-left rotation");
                self.right = self.right.take().map(Node::rotate_right);
            } else {
                trace!(left = hl, right = hr, "left rotation");
            }
            self.rotate_left()
        } else {
            self
        }
    }

    // a loop rather than a recursion, it is the hot path
    pub(crate) fn search<F>(&self, k: &K, cmp: &F) -> Option<&Self>
    where
        F: Fn(&K, &K) -> Ordering,
    {
        let mut n = self;
        loop {
            let next = match cmp(k, &n.key) {
                Ordering::Equal => return Some(n),
                Ordering::Less => &n.left,
                Ordering::Greater => &n.right,
            };
            n = next.as_deref()?;
        }
    }

    pub(crate) fn search_mut<F>(&mut self, k: &K, cmp: &F) -> Option<&mut Self>
    where
        F: Fn(&K, &K) -> Ordering,
    {
        match cmp(k, &self.key) {
            Ordering::Equal => Some(self),
            Ordering::Less => self.left.as_deref_mut()?.search_mut(k, cmp),
            Ordering::Greater => self.right.as_deref_mut()?.search_mut(k, cmp),
        }
    }

    /// floor and ceiling of `k` in one descent. Every node passed on
    /// the way down is closer to `k` than the ones above it on the
    /// same side, so the last one seen on each side is the nearest.
    pub(crate) fn enclosing<'a, F>(&'a self, k: &K, cmp: &F) -> Enclosing<'a, K, V>
    where
        F: Fn(&K, &K) -> Ordering,
    {
        let mut acc = Enclosing {
            last: None,
            first: None,
        };
        let mut cur = Some(self);
        while let Some(n) = cur {
            match cmp(k, &n.key) {
                Ordering::Equal => {
                    acc.last = Some(n);
                    acc.first = Some(n);
                    break;
                }
                Ordering::Less => {
                    acc.first = Some(n);
                    cur = n.left.as_deref();
                }
                Ordering::Greater => {
                    acc.last = Some(n);
                    cur = n.right.as_deref();
                }
            }
        }
        acc
    }

    /// Insert `node` into the subtree at `link`. `node` must be a
    /// leaf. If an equal key is already present its key and value
    /// are replaced by those of `node`, which is then dropped, and
    /// the returned flag is false.
    pub(crate) fn insert_into<F>(link: Link<K, V>, node: Box<Self>, cmp: &F) -> (Box<Self>, bool)
    where
        F: Fn(&K, &K) -> Ordering,
    {
        match link {
            None => {
                debug_assert!(node.left.is_none() && node.right.is_none());
                (node, true)
            }
            Some(n) => n.insert(node, cmp),
        }
    }

    fn insert<F>(mut self: Box<Self>, mut node: Box<Self>, cmp: &F) -> (Box<Self>, bool)
    where
        F: Fn(&K, &K) -> Ordering,
    {
        match cmp(&node.key, &self.key) {
            Ordering::Equal => {
                swap(&mut self.key, &mut node.key);
                swap(&mut self.value, &mut node.value);
                (self, false)
            }
            Ordering::Less => {
                let (l, fresh) = Node::insert_into(self.left.take(), node, cmp);
                self.left = Some(l);
                self.update_height();
                (self.rebalance(), fresh)
            }
            Ordering::Greater => {
                let (r, fresh) = Node::insert_into(self.right.take(), node, cmp);
                self.right = Some(r);
                self.update_height();
                (self.rebalance(), fresh)
            }
        }
    }

    /// find the node equal to `k` and cut it out with `take`, which
    /// returns the subtree that replaces it.
    fn unlink<F, R>(
        mut self: Box<Self>,
        k: &K,
        cmp: &F,
        take: fn(Box<Self>) -> (Link<K, V>, R),
    ) -> (Link<K, V>, Option<R>)
    where
        F: Fn(&K, &K) -> Ordering,
    {
        let found = match cmp(k, &self.key) {
            Ordering::Equal => {
                let (link, r) = take(self);
                return (link, Some(r));
            }
            Ordering::Less => match self.left.take() {
                None => None,
                Some(l) => {
                    let (l, found) = l.unlink(k, cmp, take);
                    self.left = l;
                    found
                }
            },
            Ordering::Greater => match self.right.take() {
                None => None,
                Some(r) => {
                    let (r, found) = r.unlink(k, cmp, take);
                    self.right = r;
                    found
                }
            },
        };
        match found {
            None => (Some(self), None),
            Some(found) => {
                self.update_height();
                (Some(self.rebalance()), Some(found))
            }
        }
    }

    /// remove the binding for `k`, returning the new subtree root
    /// and the removed binding. A node with two children takes over
    /// the binding of its in-order predecessor, and the
    /// predecessor's node is the one freed.
    pub(crate) fn remove<F>(self: Box<Self>, k: &K, cmp: &F) -> (Link<K, V>, Option<(K, V)>)
    where
        F: Fn(&K, &K) -> Ordering,
    {
        self.unlink(k, cmp, Node::take_entry)
    }

    /// Like `remove`, but the node holding `k` itself is cut out and
    /// returned as a leaf, every other node keeps its binding.
    pub(crate) fn detach<F>(self: Box<Self>, k: &K, cmp: &F) -> (Link<K, V>, Option<Box<Self>>)
    where
        F: Fn(&K, &K) -> Ordering,
    {
        self.unlink(k, cmp, Node::take_node)
    }

    fn take_entry(mut self: Box<Self>) -> (Link<K, V>, (K, V)) {
        match (self.left.take(), self.right.take()) {
            (None, None) => (None, self.into_entry()),
            (Some(c), None) | (None, Some(c)) => (Some(c), self.into_entry()),
            (Some(l), Some(r)) => {
                let (l, mut pred) = l.pop_last();
                swap(&mut self.key, &mut pred.key);
                swap(&mut self.value, &mut pred.value);
                self.left = l;
                self.right = Some(r);
                self.update_height();
                (Some(self.rebalance()), pred.into_entry())
            }
        }
    }

    fn take_node(mut self: Box<Self>) -> (Link<K, V>, Box<Self>) {
        let link = match (self.left.take(), self.right.take()) {
            (None, None) => None,
            (Some(c), None) | (None, Some(c)) => Some(c),
            (Some(l), Some(r)) => {
                let (l, mut pred) = l.pop_last();
                pred.left = l;
                pred.right = Some(r);
                pred.update_height();
                Some(pred.rebalance())
            }
        };
        self.height = 1;
        (link, self)
    }

    /// cut out the leftmost node of this subtree, it is returned as a leaf
    pub(crate) fn pop_first(mut self: Box<Self>) -> (Link<K, V>, Box<Self>) {
        match self.left.take() {
            None => {
                let rest = self.right.take();
                self.height = 1;
                (rest, self)
            }
            Some(l) => {
                let (l, first) = l.pop_first();
                self.left = l;
                self.update_height();
                (Some(self.rebalance()), first)
            }
        }
    }

    /// cut out the rightmost node of this subtree, it is returned as a leaf
    pub(crate) fn pop_last(mut self: Box<Self>) -> (Link<K, V>, Box<Self>) {
        match self.right.take() {
            None => {
                let rest = self.left.take();
                self.height = 1;
                (rest, self)
            }
            Some(r) => {
                let (r, last) = r.pop_last();
                self.right = r;
                self.update_height();
                (Some(self.rebalance()), last)
            }
        }
    }

    /// check the cached heights and the balance of every node,
    /// returning the height of this subtree
    pub(crate) fn check_shape(&self) -> Result<u16, String> {
        let hl = match self.left.as_deref() {
            None => 0,
            Some(l) => l.check_shape()?,
        };
        let hr = match self.right.as_deref() {
            None => 0,
            Some(r) => r.check_shape()?,
        };
        let h = 1 + max(hl, hr);
        if h != self.height {
            return Err(format!("node height is wrong {} vs {}", self.height, h));
        }
        if max(hl, hr) - hl.min(hr) > 1 {
            return Err(format!("tree is unbalanced left {} right {}", hl, hr));
        }
        Ok(h)
    }
}

/// In-order iterator over the nodes of a tree, in either direction.
///
/// The stack holds the path from the root to the next node, so the
/// iterator runs in O(log(N)) space and amortized constant time per
/// element.
pub struct Nodes<'a, K, V> {
    stack: ArrayVec<&'a Node<K, V>, MAX_DEPTH>,
    ascending: bool,
}

impl<'a, K, V> Nodes<'a, K, V> {
    pub(crate) fn new(root: Option<&'a Node<K, V>>, ascending: bool) -> Self {
        let mut t = Nodes {
            stack: ArrayVec::new(),
            ascending,
        };
        t.push_spine(root);
        t
    }

    fn push_spine(&mut self, mut cur: Option<&'a Node<K, V>>) {
        while let Some(n) = cur {
            self.stack.push(n);
            cur = if self.ascending {
                n.left.as_deref()
            } else {
                n.right.as_deref()
            };
        }
    }
}

impl<'a, K, V> Clone for Nodes<'a, K, V> {
    fn clone(&self) -> Self {
        Nodes {
            stack: self.stack.clone(),
            ascending: self.ascending,
        }
    }
}

impl<'a, K, V> Iterator for Nodes<'a, K, V> {
    type Item = &'a Node<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.stack.pop()?;
        let next = if self.ascending {
            n.right.as_deref()
        } else {
            n.left.as_deref()
        };
        self.push_spine(next);
        Some(n)
    }
}

impl<'a, K, V> FusedIterator for Nodes<'a, K, V> {}

/// Iterator over the bindings of a tree, see `Tree::iter` and
/// `Tree::descend`
pub struct Iter<'a, K, V>(pub(crate) Nodes<'a, K, V>);

impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Iter(self.0.clone())
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|n| (&n.key, &n.value))
    }
}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}
