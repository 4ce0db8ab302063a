//! Equality used by `assert_eq`.
//!
//! Exact for every type except `f32`/`f64`, which compare equal when their
//! absolute difference is below [`FLOAT_TOLERANCE`]. Collections and
//! references compare element-wise through the same trait, so a `Vec<f64>`
//! picks up the tolerance too.

use std::borrow::Cow;
use std::time::Duration;

/// Absolute tolerance for floating point equality.
pub const FLOAT_TOLERANCE: f64 = 1e-4;

/// Equality as seen by proofs.
///
/// User types opt in with [`impl_proof_eq!`](crate::impl_proof_eq), which
/// delegates to `PartialEq`.
pub trait ProofEq<Rhs: ?Sized = Self> {
    fn proof_eq(&self, other: &Rhs) -> bool;
}

macro_rules! exact_proof_eq {
    ($($t:ty),* $(,)?) => {
        $(
            impl ProofEq for $t {
                fn proof_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

exact_proof_eq!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, (), str,
    String, Duration
);

impl ProofEq for f32 {
    fn proof_eq(&self, other: &Self) -> bool {
        f64::from((other - self).abs()) < FLOAT_TOLERANCE
    }
}

impl ProofEq for f64 {
    fn proof_eq(&self, other: &Self) -> bool {
        (other - self).abs() < FLOAT_TOLERANCE
    }
}

impl ProofEq<String> for str {
    fn proof_eq(&self, other: &String) -> bool {
        self == other.as_str()
    }
}

impl ProofEq<str> for String {
    fn proof_eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl ProofEq<&str> for String {
    fn proof_eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl ProofEq<String> for &str {
    fn proof_eq(&self, other: &String) -> bool {
        *self == other.as_str()
    }
}

impl<'a, 'b> ProofEq<Cow<'b, str>> for Cow<'a, str> {
    fn proof_eq(&self, other: &Cow<'b, str>) -> bool {
        self.as_ref() == other.as_ref()
    }
}

impl<'a, 'b, A, B> ProofEq<&'b B> for &'a A
where
    A: ProofEq<B> + ?Sized,
    B: ?Sized,
{
    fn proof_eq(&self, other: &&'b B) -> bool {
        (**self).proof_eq(*other)
    }
}

impl<A: ProofEq<B>, B> ProofEq<[B]> for [A] {
    fn proof_eq(&self, other: &[B]) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.proof_eq(b))
    }
}

impl<A: ProofEq<B>, B, const N: usize> ProofEq<[B; N]> for [A; N] {
    fn proof_eq(&self, other: &[B; N]) -> bool {
        self[..].proof_eq(&other[..])
    }
}

impl<A: ProofEq<B>, B> ProofEq<Vec<B>> for Vec<A> {
    fn proof_eq(&self, other: &Vec<B>) -> bool {
        self[..].proof_eq(&other[..])
    }
}

impl<A: ProofEq<B>, B, const N: usize> ProofEq<[B; N]> for Vec<A> {
    fn proof_eq(&self, other: &[B; N]) -> bool {
        self[..].proof_eq(&other[..])
    }
}

impl<A: ProofEq<B>, B> ProofEq<Option<B>> for Option<A> {
    fn proof_eq(&self, other: &Option<B>) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.proof_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<A1: ProofEq<B1>, A2: ProofEq<B2>, B1, B2> ProofEq<(B1, B2)> for (A1, A2) {
    fn proof_eq(&self, other: &(B1, B2)) -> bool {
        self.0.proof_eq(&other.0) && self.1.proof_eq(&other.1)
    }
}

/// Implement [`ProofEq`] for types that compare exactly via `PartialEq`.
#[macro_export]
macro_rules! impl_proof_eq {
    ($($t:ty),+ $(,)?) => {
        $(
            impl $crate::ProofEq for $t {
                fn proof_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_within_tolerance_are_equal() {
        for magnitude in [0.0_f64, 1.0, 1000.0, 10000.0, 10_000_000.0] {
            assert!(magnitude.proof_eq(&magnitude));
            assert!(magnitude.proof_eq(&(magnitude + 0.00005)));
            assert!(!magnitude.proof_eq(&(magnitude + 0.001)));
        }
        for magnitude in [0.0_f32, 1.0, 1000.0, 10000.0, 10_000_000.0] {
            assert!(magnitude.proof_eq(&magnitude));
        }
        assert!(!10_000_000.0_f32.proof_eq(&10_000_001.0_f32));
        assert!(0.1_f32.proof_eq(&0.10001_f32));
    }

    #[test]
    fn strings_compare_across_owned_and_borrowed() {
        assert!("test".proof_eq("test"));
        assert!(String::from("a").proof_eq("a"));
        assert!("a".proof_eq(&String::from("a")));
        assert!(!"a".proof_eq("b"));
        assert!(ProofEq::<&str>::proof_eq(&"a", &"a"));
        assert!(b"test".proof_eq(b"test"));
        assert!(Cow::Borrowed("x").proof_eq(&Cow::<str>::Owned("x".to_string())));
    }

    #[test]
    fn collections_compare_elementwise() {
        assert!(vec![1.0_f64, 2.0].proof_eq(&vec![1.00001_f64, 2.0]));
        assert!(!vec![1_i32, 2].proof_eq(&vec![1_i32, 2, 3]));
        assert!(Some(3_i32).proof_eq(&Some(3_i32)));
        assert!(!Some(3_i32).proof_eq(&None::<i32>));
        assert!((1_i32, "x").proof_eq(&(1_i32, "x")));
    }
}
