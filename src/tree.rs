use crate::{
    avl::{Enclosing, Iter, Link, Node, Nodes},
    error::{Error, Result},
    key::{Comparator, Converter, Key, Order, Primitive},
};
use std::{
    cmp::Ordering,
    default::Default,
    fmt::{self, Debug, Formatter},
    iter::IntoIterator,
    rc::Rc,
};
use tracing::debug;

/// How a `Tree` orders its keys. Both parts are optional, without
/// them keys must order themselves (see `Key`).
///
/// # Examples
/// ```
/// use avl_keyed::{Key, Options, Primitive, Tree};
///
/// struct Word(String);
/// impl Key for Word {}
///
/// let opts = Options::new().comparator(|a: &i32, b: &i32| b.cmp(a));
/// let mut t = Tree::with_options(opts);
/// t.push([1, 3, 2]).unwrap();
/// assert_eq!(t.values().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
///
/// let opts = Options::new().converter(|w: &Word| Some(Primitive::Int(w.0.len() as i128)));
/// let mut t = Tree::with_options(opts);
/// t.set(Word("three".into()), "three").unwrap();
/// t.set(Word("one".into()), "one").unwrap();
/// assert_eq!(t.min(), Some(&"one"));
/// ```
pub struct Options<K> {
    comparator: Option<Comparator<K>>,
    converter: Option<Converter<K>>,
}

impl<K> Clone for Options<K> {
    fn clone(&self) -> Self {
        Options {
            comparator: self.comparator.clone(),
            converter: self.converter.clone(),
        }
    }
}

impl<K> Default for Options<K> {
    fn default() -> Self {
        Options::new()
    }
}

impl<K> Debug for Options<K> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Options")
            .field("comparator", &self.comparator.is_some())
            .field("converter", &self.converter.is_some())
            .finish()
    }
}

impl<K> Options<K> {
    pub fn new() -> Self {
        Options {
            comparator: None,
            converter: None,
        }
    }

    /// order keys with `f`, taking priority over every other strategy
    pub fn comparator<F>(mut self, f: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        self.comparator = Some(Rc::new(f));
        self
    }

    /// derive a primitive key with `f` when the key is neither
    /// comparable nor primitive itself
    pub fn converter<F>(mut self, f: F) -> Self
    where
        F: Fn(&K) -> Option<Primitive<'static>> + 'static,
    {
        self.converter = Some(Rc::new(f));
        self
    }

    pub fn has_comparator(&self) -> bool {
        self.comparator.is_some()
    }

    pub fn has_converter(&self) -> bool {
        self.converter.is_some()
    }
}

impl<K: Key> Options<K> {
    fn order(&self, k: &K) -> Result<Order<'_, K>> {
        Order::resolve(k, self.comparator.as_ref(), self.converter.as_ref()).ok_or(Error::Compare)
    }
}

/// A mutable ordered map backed by an AVL tree.
///
/// get, set, remove, and the nearest key searches run in log(N)
/// time. Each operation first settles how its key is ordered (see
/// `Key`), then walks the tree. Every key in a tree must be ordered
/// the same way, mixing strategies (for example setting a
/// comparator after keys were inserted by conversion) leaves the
/// order of the tree unspecified.
///
/// Nodes are never copied. A node keeps its address from the insert
/// of its key until that key is removed, including across
/// `move_node`.
///
/// Iterators borrow the tree, so it can't be changed while one is
/// alive.
///
/// # Examples
/// ```
/// use avl_keyed::Tree;
///
/// let mut t = Tree::new();
/// assert!(t.set("b", 2).unwrap());
/// assert!(t.set("a", 1).unwrap());
/// assert!(!t.set("a", 10).unwrap());
///
/// assert_eq!(t.get(&"a").unwrap(), Some(&10));
/// assert_eq!(t.get(&"z").unwrap(), None);
/// assert_eq!(t.remove(&"b").unwrap(), Some(2));
///
/// for (k, v) in &t {
///     println!("key {}, val: {}", k, v)
/// }
/// ```
pub struct Tree<K, V> {
    root: Link<K, V>,
    options: Options<K>,
}

impl<K, V> Clone for Tree<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Tree {
            root: self.root.clone(),
            options: self.options.clone(),
        }
    }
}

impl<K, V> Default for Tree<K, V> {
    fn default() -> Tree<K, V> {
        Tree::new()
    }
}

impl<K, V> Debug for Tree<K, V>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a Tree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> Tree<K, V> {
    /// Create a new empty tree
    pub fn new() -> Self {
        Tree::with_options(Options::new())
    }

    pub fn with_options(options: Options<K>) -> Self {
        Tree {
            root: None,
            options,
        }
    }

    #[cfg(feature = "serde")]
    pub(crate) fn from_root(root: Link<K, V>) -> Self {
        Tree {
            root,
            options: Options::new(),
        }
    }

    pub fn with_comparator<F>(f: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        Tree::with_options(Options::new().comparator(f))
    }

    pub fn with_converter<F>(f: F) -> Self
    where
        F: Fn(&K) -> Option<Primitive<'static>> + 'static,
    {
        Tree::with_options(Options::new().converter(f))
    }

    /// Replace the comparator. Existing keys are not reordered.
    pub fn set_comparator<F>(&mut self, f: F)
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        self.options.comparator = Some(Rc::new(f));
    }

    /// Replace the converter. Existing keys are not reordered.
    pub fn set_converter<F>(&mut self, f: F)
    where
        F: Fn(&K) -> Option<Primitive<'static>> + 'static,
    {
        self.options.converter = Some(Rc::new(f));
    }

    pub fn options(&self) -> &Options<K> {
        &self.options
    }

    /// the number of bindings, counted by a full traversal in O(N)
    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// the height of the root, 0 for an empty tree
    pub fn height(&self) -> u16 {
        self.root.as_deref().map_or(0, Node::height)
    }

    pub fn clear(&mut self) {
        self.root = None
    }

    /// The root node. Together with `Node::left`, `Node::right`, and
    /// `Node::height` this exposes the whole shape of the tree.
    pub fn root(&self) -> Option<&Node<K, V>> {
        self.root.as_deref()
    }

    /// the value bound to the smallest key
    pub fn min(&self) -> Option<&V> {
        self.root.as_deref().map(|n| n.first().value())
    }

    /// the value bound to the greatest key
    pub fn max(&self) -> Option<&V> {
        self.root.as_deref().map(|n| n.last().value())
    }

    /// remove and return the binding with the smallest key
    pub fn pop_min(&mut self) -> Option<(K, V)> {
        let (root, first) = self.root.take()?.pop_first();
        self.root = root;
        Some(first.into_entry())
    }

    /// remove and return the binding with the greatest key
    pub fn pop_max(&mut self) -> Option<(K, V)> {
        let (root, last) = self.root.take()?.pop_last();
        self.root = root;
        Some(last.into_entry())
    }

    /// iterate over the bindings in ascending key order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter(Nodes::new(self.root.as_deref(), true))
    }

    /// iterate over the bindings in descending key order
    pub fn descend(&self) -> Iter<'_, K, V> {
        Iter(Nodes::new(self.root.as_deref(), false))
    }

    /// iterate over the values in ascending key order
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// iterate over the nodes in ascending key order
    pub fn nodes(&self) -> Nodes<'_, K, V> {
        Nodes::new(self.root.as_deref(), true)
    }

    /// the values in ascending key order
    pub fn to_vec(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.iter().map(|(_, v)| v.clone()).collect()
    }
}

impl<K: Key, V> Tree<K, V> {
    /// Bind `key` to `value`. Returns true if the key was not present
    /// before. Otherwise the stored key and value are both replaced,
    /// and the node holding them stays the same.
    pub fn set(&mut self, key: K, value: V) -> Result<bool> {
        let order = self.options.order(&key)?;
        let cmp = |a: &K, b: &K| order.compare(a, b);
        let node = Box::new(Node::new(key, value));
        let (root, fresh) = Node::insert_into(self.root.take(), node, &cmp);
        self.root = Some(root);
        Ok(fresh)
    }

    /// `set` every binding, returning true only if every key was new.
    /// If any key can't be ordered nothing is inserted.
    ///
    /// ```
    /// use avl_keyed::Tree;
    ///
    /// let mut t = Tree::new();
    /// assert!(t.put([(1, 'a'), (2, 'b')]).unwrap());
    /// assert!(!t.put([(3, 'c'), (1, 'd')]).unwrap());
    /// assert_eq!(t.to_vec(), vec!['d', 'b', 'c']);
    /// ```
    pub fn put<I>(&mut self, bindings: I) -> Result<bool>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let bindings: Vec<(K, V)> = bindings.into_iter().collect();
        for (k, _) in &bindings {
            self.options.order(k)?;
        }
        let mut fresh = true;
        for (k, v) in bindings {
            fresh &= self.set(k, v)?;
        }
        Ok(fresh)
    }

    /// lookup the value bound to `key`, a missing key is `Ok(None)`
    pub fn get(&self, key: &K) -> Result<Option<&V>> {
        Ok(self.get_node(key)?.map(Node::value))
    }

    pub fn get_mut(&mut self, key: &K) -> Result<Option<&mut V>> {
        let order = self.options.order(key)?;
        let cmp = |a: &K, b: &K| order.compare(a, b);
        Ok(self
            .root
            .as_deref_mut()
            .and_then(|r| r.search_mut(key, &cmp))
            .map(Node::value_mut))
    }

    /// lookup the node holding `key`
    pub fn get_node(&self, key: &K) -> Result<Option<&Node<K, V>>> {
        let order = self.options.order(key)?;
        let cmp = |a: &K, b: &K| order.compare(a, b);
        Ok(self.root.as_deref().and_then(|r| r.search(key, &cmp)))
    }

    pub fn has(&self, key: &K) -> Result<bool> {
        Ok(self.get_node(key)?.is_some())
    }

    /// true if every one of `keys` is present
    pub fn has_all<'a, I>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        for k in keys {
            if !self.has(k)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// true if at least one of `keys` is present
    pub fn any<'a, I>(&self, keys: I) -> Result<bool>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        for k in keys {
            if self.has(k)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// remove the binding for `key`, returning its value if it was
    /// present
    pub fn remove(&mut self, key: &K) -> Result<Option<V>> {
        let order = self.options.order(key)?;
        let cmp = |a: &K, b: &K| order.compare(a, b);
        Ok(match self.root.take() {
            None => None,
            Some(root) => {
                let (root, removed) = root.remove(key, &cmp);
                self.root = root;
                removed.map(|(_, v)| v)
            }
        })
    }

    /// The nearest nodes at or below (`last`) and at or above
    /// (`first`) `key`, found in a single descent. When `key` is
    /// present both are its node.
    ///
    /// ```
    /// use avl_keyed::Tree;
    ///
    /// let mut t = Tree::new();
    /// t.push([1., 2., 4., 7., 8., 10., 12., 14.]).unwrap();
    /// let e = t.enclosing_nodes(&13.66).unwrap();
    /// assert_eq!(e.last.map(|n| *n.key()), Some(12.));
    /// assert_eq!(e.first.map(|n| *n.key()), Some(14.));
    /// ```
    pub fn enclosing_nodes(&self, key: &K) -> Result<Enclosing<'_, K, V>> {
        let order = self.options.order(key)?;
        let cmp = |a: &K, b: &K| order.compare(a, b);
        Ok(match self.root.as_deref() {
            None => Enclosing {
                last: None,
                first: None,
            },
            Some(r) => r.enclosing(key, &cmp),
        })
    }

    /// the node with the greatest key less than or equal to `key`
    pub fn last_node_from(&self, key: &K) -> Result<Option<&Node<K, V>>> {
        Ok(self.enclosing_nodes(key)?.last)
    }

    /// the node with the smallest key greater than or equal to `key`
    pub fn first_node_from(&self, key: &K) -> Result<Option<&Node<K, V>>> {
        Ok(self.enclosing_nodes(key)?.first)
    }

    /// Rebind the node holding `from` to the key `to`, moving the
    /// node itself to its new place rather than allocating a new
    /// one. Returns false, leaving the tree untouched, if `from` is
    /// missing or `to` is already present.
    ///
    /// ```
    /// use avl_keyed::Tree;
    ///
    /// let mut t = Tree::new();
    /// t.push([1, 2, 3, 4]).unwrap();
    /// let before: *const _ = t.get_node(&3).unwrap().unwrap();
    /// assert!(t.move_node(&3, 7).unwrap());
    /// assert!(std::ptr::eq(before, t.get_node(&7).unwrap().unwrap()));
    /// assert!(!t.move_node(&7, 4).unwrap());
    /// ```
    pub fn move_node(&mut self, from: &K, to: K) -> Result<bool> {
        let from_order = self.options.order(from)?;
        let to_order = self.options.order(&to)?;
        let by_from = |a: &K, b: &K| from_order.compare(a, b);
        let by_to = |a: &K, b: &K| to_order.compare(a, b);
        let root = match self.root.take() {
            None => return Ok(false),
            Some(root) => root,
        };
        if root.search(from, &by_from).is_none() {
            debug!("not moving node, the source key is absent");
            self.root = Some(root);
            return Ok(false);
        }
        if root.search(&to, &by_to).is_some() {
            debug!("not moving node, the destination key is occupied");
            self.root = Some(root);
            return Ok(false);
        }
        let (root, node) = root.detach(from, &by_from);
        let mut node = match node {
            None => {
                self.root = root;
                return Ok(false);
            }
            Some(node) => node,
        };
        node.set_key(to);
        let (root, _) = Node::insert_into(root, node, &by_to);
        self.root = Some(root);
        Ok(true)
    }

    #[allow(dead_code)]
    pub(crate) fn invariant(&self)
    where
        K: Debug,
    {
        let root = match self.root.as_deref() {
            None => return,
            Some(root) => root,
        };
        if let Err(e) = root.check_shape() {
            panic!("{}", e)
        }
        let order = match self.options.order(root.key()) {
            Ok(order) => order,
            Err(e) => panic!("{}", e),
        };
        let mut prev: Option<&K> = None;
        for (k, _) in self.iter() {
            if let Some(p) = prev {
                if order.compare(p, k) != Ordering::Less {
                    panic!("keys out of order {:?} {:?}", p, k)
                }
            }
            prev = Some(k);
        }
    }
}

impl<K: Key + Clone> Tree<K, K> {
    /// Insert each value bound to itself, returning true only if
    /// every one was new. If any value can't be turned into an
    /// ordered key nothing is inserted and `Error::Convert` is
    /// returned.
    ///
    /// ```
    /// use avl_keyed::Tree;
    ///
    /// let mut t = Tree::new();
    /// assert!(t.push([4, 2, 3, 1]).unwrap());
    /// assert!(!t.push([5, 2]).unwrap());
    /// assert_eq!(t.to_vec(), vec![1, 2, 3, 4, 5]);
    /// ```
    pub fn push<I>(&mut self, values: I) -> Result<bool>
    where
        I: IntoIterator<Item = K>,
    {
        let values: Vec<K> = values.into_iter().collect();
        for v in &values {
            self.options.order(v).map_err(|_| Error::Convert)?;
        }
        let mut fresh = true;
        for v in values {
            fresh &= self.set(v.clone(), v)?;
        }
        Ok(fresh)
    }
}
