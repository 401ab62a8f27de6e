//! Monoid trait for types with identity elements
//!
//! A `Monoid` extends `Semigroup` by adding an identity element. The generic
//! combinator core relies on this to start a context accumulation from
//! nothing: an empty [`crate::Log`] for writer effects, unit for plain ones.
//!
//! # Mathematical Properties
//!
//! For a type to be a valid Monoid, it must satisfy:
//! 1. **Associativity** (from Semigroup):
//!    ```text
//!    a.combine(b).combine(c) == a.combine(b.combine(c))
//!    ```
//! 2. **Right Identity**:
//!    ```text
//!    a.combine(M::empty()) == a
//!    ```
//! 3. **Left Identity**:
//!    ```text
//!    M::empty().combine(a) == a
//!    ```
//!
//! # Examples
//!
//! ```
//! use breakwater::{Monoid, Semigroup};
//!
//! let v1 = vec![1, 2, 3];
//! let empty: Vec<i32> = Monoid::empty();
//! assert_eq!(v1.clone().combine(empty.clone()), v1);
//! assert_eq!(empty.combine(v1.clone()), v1);
//! ```

use crate::Semigroup;

/// A `Monoid` is a `Semigroup` with an identity element.
///
/// # Laws
///
/// For any value `a` of type `M` where `M: Monoid`:
///
/// ```text
/// a.combine(M::empty()) == a           (right identity)
/// M::empty().combine(a) == a           (left identity)
/// ```
pub trait Monoid: Semigroup {
    /// The identity element for this monoid.
    ///
    /// Satisfies: `a.combine(Self::empty()) == a` and `Self::empty().combine(a) == a`
    fn empty() -> Self;
}

impl<T> Monoid for Vec<T> {
    fn empty() -> Self {
        Vec::new()
    }
}

impl Monoid for String {
    fn empty() -> Self {
        String::new()
    }
}

impl Monoid for () {
    fn empty() -> Self {}
}

impl<T: Semigroup> Monoid for Option<T> {
    fn empty() -> Self {
        None
    }
}

macro_rules! impl_monoid_tuple {
    ($($idx:tt $T:ident),+) => {
        impl<$($T: Monoid),+> Monoid for ($($T,)+) {
            fn empty() -> Self {
                ($($T::empty(),)+)
            }
        }
    };
}

impl_monoid_tuple!(0 T1, 1 T2);
impl_monoid_tuple!(0 T1, 1 T2, 2 T3);
impl_monoid_tuple!(0 T1, 1 T2, 2 T3, 3 T4);

/// Fold a collection of monoid values into one, starting from the identity.
///
/// # Examples
///
/// ```
/// use breakwater::monoid::fold_all;
///
/// let merged = fold_all(vec![vec![1], vec![2, 3], vec![]]);
/// assert_eq!(merged, vec![1, 2, 3]);
/// ```
pub fn fold_all<M: Monoid>(items: impl IntoIterator<Item = M>) -> M {
    items
        .into_iter()
        .fold(M::empty(), |acc, item| acc.combine(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_identity() {
        let v = vec![1, 2, 3];
        let empty: Vec<i32> = Monoid::empty();
        assert_eq!(v.clone().combine(empty.clone()), v);
        assert_eq!(empty.combine(v.clone()), v);
    }

    #[test]
    fn test_string_identity() {
        let s = "hello".to_string();
        let empty: String = Monoid::empty();
        assert_eq!(s.clone().combine(empty), s);
    }

    #[test]
    fn test_fold_all() {
        let vecs = vec![vec![1], vec![2], vec![3]];
        assert_eq!(fold_all(vecs), vec![1, 2, 3]);
    }

    #[test]
    fn test_fold_all_empty() {
        let vecs: Vec<Vec<i32>> = vec![];
        assert_eq!(fold_all(vecs), Vec::<i32>::new());
    }
}
