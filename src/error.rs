use thiserror::Error;

/// Failure to find an ordering for a key. Lookup misses are not
/// errors, they are reported as `None` or `false`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// no comparator is configured, and the key can neither order
    /// itself nor be converted to a primitive
    #[error(
        "cannot compare, no sufficient comparing method. \
         Either implement Key::self_ordering or supply a comparator"
    )]
    Compare,
    /// an implicit key (see `Tree::push`) could not be derived from
    /// the value
    #[error(
        "cannot convert, no sufficient conversion method. \
         Either implement Key::convert_to or supply a converter"
    )]
    Convert,
}

pub type Result<T> = std::result::Result<T, Error>;
