use std::{
    borrow::Cow,
    cmp::{Ord, Ordering, PartialEq, PartialOrd},
    fmt::{self, Debug, Formatter},
    ops::{Deref, DerefMut},
    rc::Rc,
};

/// An orderable surrogate derived from a key when neither a
/// comparator nor a self ordering is available.
///
/// Numbers compare by exact value regardless of representation, so
/// `Int(2)`, `UInt(2)` and `Float(2.0)` are the same key, as are
/// `Float(0.0)` and `Float(-0.0)`. Every number sorts before every
/// string, and strings compare lexicographically.
#[derive(Clone, Debug)]
pub enum Primitive<'a> {
    Int(i128),
    /// unsigned integers beyond the range of `Int`
    UInt(u128),
    Float(f64),
    Str(Cow<'a, str>),
}

impl<'a> Primitive<'a> {
    pub fn into_owned(self) -> Primitive<'static> {
        match self {
            Primitive::Int(i) => Primitive::Int(i),
            Primitive::UInt(u) => Primitive::UInt(u),
            Primitive::Float(f) => Primitive::Float(f),
            Primitive::Str(s) => Primitive::Str(Cow::Owned(s.into_owned())),
        }
    }
}

impl From<i64> for Primitive<'static> {
    fn from(i: i64) -> Self {
        Primitive::Int(i as i128)
    }
}

impl From<f64> for Primitive<'static> {
    fn from(f: f64) -> Self {
        Primitive::Float(f)
    }
}

impl From<String> for Primitive<'static> {
    fn from(s: String) -> Self {
        Primitive::Str(Cow::Owned(s))
    }
}

impl<'a> From<&'a str> for Primitive<'a> {
    fn from(s: &'a str) -> Self {
        Primitive::Str(Cow::Borrowed(s))
    }
}

// 2^127 and 2^128, both exact in an f64
const I128_END: f64 = i128::MAX as f64;
const U128_END: f64 = u128::MAX as f64;

// where a number falls relative to a NaN, following f64::total_cmp
fn cmp_nan(f: f64) -> Ordering {
    if f.is_sign_negative() {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

// an integer against f, once it equals the integral part of f
fn cmp_frac(f: f64) -> Ordering {
    0f64.partial_cmp(&(f - f.trunc())).unwrap_or(Ordering::Equal)
}

fn cmp_int_float(i: i128, f: f64) -> Ordering {
    if f.is_nan() {
        cmp_nan(f)
    } else if f >= I128_END {
        Ordering::Less
    } else if f < -I128_END {
        Ordering::Greater
    } else {
        i.cmp(&(f.trunc() as i128)).then_with(|| cmp_frac(f))
    }
}

fn cmp_uint_float(u: u128, f: f64) -> Ordering {
    if let Ok(i) = i128::try_from(u) {
        return cmp_int_float(i, f);
    }
    if f.is_nan() {
        cmp_nan(f)
    } else if f < I128_END {
        Ordering::Greater
    } else if f >= U128_END {
        Ordering::Less
    } else {
        // floats this large are integral
        u.cmp(&(f as u128))
    }
}

fn cmp_int_uint(i: i128, u: u128) -> Ordering {
    match u128::try_from(i) {
        Ok(i) => i.cmp(&u),
        Err(_) => Ordering::Less,
    }
}

fn unsigned_zero(f: f64) -> f64 {
    if f == 0. {
        0.
    } else {
        f
    }
}

impl<'a> Ord for Primitive<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        use Primitive::*;
        match (self, other) {
            (Int(a), Int(b)) => a.cmp(b),
            (UInt(a), UInt(b)) => a.cmp(b),
            (Float(a), Float(b)) => unsigned_zero(*a).total_cmp(&unsigned_zero(*b)),
            (Int(a), UInt(b)) => cmp_int_uint(*a, *b),
            (UInt(a), Int(b)) => cmp_int_uint(*b, *a).reverse(),
            (Int(a), Float(b)) => cmp_int_float(*a, *b),
            (Float(a), Int(b)) => cmp_int_float(*b, *a).reverse(),
            (UInt(a), Float(b)) => cmp_uint_float(*a, *b),
            (Float(a), UInt(b)) => cmp_uint_float(*b, *a).reverse(),
            (Str(a), Str(b)) => a.cmp(b),
            (Str(_), _) => Ordering::Greater,
            (_, Str(_)) => Ordering::Less,
        }
    }
}

impl<'a> PartialOrd for Primitive<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> PartialEq for Primitive<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<'a> Eq for Primitive<'a> {}

/// The ordering capabilities of a key type. Every method has a
/// default that reports the capability as missing, so a type only
/// implements what it actually supports.
///
/// A `Tree` picks one strategy per operation, in this order
///
/// 1. the comparator configured on the tree
/// 2. `self_ordering`
/// 3. a `Primitive` surrogate, taken from `as_primitive`, then the
///    tree's converter, then `convert_to`
///
/// # Examples
/// ```
/// use std::cmp::Ordering;
/// use avl_keyed::{Key, Tree};
///
/// #[derive(Debug)]
/// struct Coord { x: i32, y: i32 }
///
/// impl Coord {
///     fn compare_to(&self, other: &Coord) -> Ordering {
///         self.y.cmp(&other.y).then(self.x.cmp(&other.x))
///     }
/// }
///
/// impl Key for Coord {
///     fn self_ordering() -> Option<fn(&Self, &Self) -> Ordering> {
///         Some(Coord::compare_to)
///     }
/// }
///
/// let mut t = Tree::new();
/// t.set(Coord { x: 5, y: 1 }, "a").unwrap();
/// t.set(Coord { x: 0, y: 0 }, "b").unwrap();
/// assert_eq!(t.min(), Some(&"b"));
/// ```
pub trait Key: Sized {
    /// a comparison function over two instances of this type
    fn self_ordering() -> Option<fn(&Self, &Self) -> Ordering> {
        None
    }

    /// the key itself, viewed as a number or a string
    fn as_primitive(&self) -> Option<Primitive<'_>> {
        None
    }

    /// a derived primitive key, used when nothing else applies
    fn convert_to(&self) -> Option<Primitive<'_>> {
        None
    }
}

macro_rules! int_key {
    ($($t:ty),*) => {
        $(impl Key for $t {
            fn as_primitive(&self) -> Option<Primitive<'_>> {
                Some(Primitive::Int(*self as i128))
            }
        })*
    };
}

int_key!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, usize);

impl Key for u128 {
    fn as_primitive(&self) -> Option<Primitive<'_>> {
        match i128::try_from(*self) {
            Ok(i) => Some(Primitive::Int(i)),
            Err(_) => Some(Primitive::UInt(*self)),
        }
    }
}

impl Key for f32 {
    fn as_primitive(&self) -> Option<Primitive<'_>> {
        Some(Primitive::Float(*self as f64))
    }
}

impl Key for f64 {
    fn as_primitive(&self) -> Option<Primitive<'_>> {
        Some(Primitive::Float(*self))
    }
}

impl Key for String {
    fn as_primitive(&self) -> Option<Primitive<'_>> {
        Some(Primitive::Str(Cow::Borrowed(self.as_str())))
    }
}

impl<'a> Key for &'a str {
    fn as_primitive(&self) -> Option<Primitive<'_>> {
        Some(Primitive::Str(Cow::Borrowed(*self)))
    }
}

impl Key for bool {
    fn as_primitive(&self) -> Option<Primitive<'_>> {
        Some(Primitive::Int(*self as i128))
    }
}

impl Key for Primitive<'static> {
    fn as_primitive(&self) -> Option<Primitive<'_>> {
        Some(self.clone())
    }
}

impl Key for char {
    fn as_primitive(&self) -> Option<Primitive<'_>> {
        Some(Primitive::Str(Cow::Owned(self.to_string())))
    }
}

/// Gives any `Ord` type the self ordering capability.
///
/// ```
/// use avl_keyed::{Ordered, Tree};
///
/// let mut t = Tree::new();
/// t.push([Ordered((1, 'b')), Ordered((0, 'z')), Ordered((1, 'a'))]).unwrap();
/// let keys: Vec<_> = t.values().map(|k| k.0).collect();
/// assert_eq!(keys, vec![(0, 'z'), (1, 'a'), (1, 'b')]);
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ordered<T>(pub T);

fn cmp_ordered<T: Ord>(a: &Ordered<T>, b: &Ordered<T>) -> Ordering {
    a.0.cmp(&b.0)
}

impl<T: Ord> Key for Ordered<T> {
    fn self_ordering() -> Option<fn(&Self, &Self) -> Ordering> {
        Some(cmp_ordered::<T>)
    }
}

impl<T: Debug> Debug for Ordered<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T> Deref for Ordered<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Ordered<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> From<T> for Ordered<T> {
    fn from(t: T) -> Self {
        Ordered(t)
    }
}

pub(crate) type Comparator<K> = Rc<dyn Fn(&K, &K) -> Ordering>;
pub(crate) type Converter<K> = Rc<dyn Fn(&K) -> Option<Primitive<'static>>>;

/// The strategy resolved for one operation.
pub(crate) enum Order<'t, K> {
    Comparator(&'t dyn Fn(&K, &K) -> Ordering),
    SelfOrdering(fn(&K, &K) -> Ordering),
    Converted(Option<&'t dyn Fn(&K) -> Option<Primitive<'static>>>),
}

fn surrogate<'a, K: Key>(
    k: &'a K,
    converter: Option<&dyn Fn(&K) -> Option<Primitive<'static>>>,
) -> Option<Primitive<'a>> {
    k.as_primitive()
        .or_else(|| converter.and_then(|f| f(k)))
        .or_else(|| k.convert_to())
}

impl<'t, K: Key> Order<'t, K> {
    /// None if no strategy applies to `k`
    pub(crate) fn resolve(
        k: &K,
        comparator: Option<&'t Comparator<K>>,
        converter: Option<&'t Converter<K>>,
    ) -> Option<Self> {
        if let Some(c) = comparator {
            return Some(Order::Comparator(&**c));
        }
        if let Some(f) = K::self_ordering() {
            return Some(Order::SelfOrdering(f));
        }
        let converter = converter.map(|c| &**c as &dyn Fn(&K) -> Option<Primitive<'static>>);
        surrogate(k, converter).map(|_| Order::Converted(converter))
    }

    pub(crate) fn compare(&self, a: &K, b: &K) -> Ordering {
        match self {
            Order::Comparator(f) => f(a, b),
            Order::SelfOrdering(f) => f(a, b),
            // a stored key without a surrogate can only come from mixing
            // strategies, it sorts first
            Order::Converted(conv) => surrogate(a, *conv).cmp(&surrogate(b, *conv)),
        }
    }
}
