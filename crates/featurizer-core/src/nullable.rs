//! Nullable values.
//!
//! Estimators and imputers treat `None` and floating-point `NaN` as missing. [`Nullable`]
//! abstracts over both so that one imputer works for `Option<i32>`, `Option<String>` and
//! plain `f64` columns alike.

/// A value that may be null.
pub trait Nullable: Clone {
    /// The non-null value type.
    type Value: Clone;

    /// Creates the null value.
    fn null() -> Self;

    fn is_null(&self) -> bool;

    /// Returns the non-null value, or `None` if `self` is null.
    fn nullable_value(&self) -> Option<Self::Value>;
}

impl<T> Nullable for Option<T>
where
    T: Clone,
{
    type Value = T;

    fn null() -> Self {
        None
    }

    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn nullable_value(&self) -> Option<T> {
        self.clone()
    }
}

macro_rules! impl_nullable_float {
    ($($ty:ty),+) => {
        $(
            impl Nullable for $ty {
                type Value = $ty;

                fn null() -> Self {
                    <$ty>::NAN
                }

                fn is_null(&self) -> bool {
                    self.is_nan()
                }

                fn nullable_value(&self) -> Option<$ty> {
                    (!self.is_nan()).then_some(*self)
                }
            }
        )+
    };
}

impl_nullable_float!(f32, f64);

/// Conversion from a non-null input value into an imputer's output type.
///
/// Every type converts into itself. Primitive numbers also widen into `f64`, which is the
/// output of statistics such as the mean.
pub trait ImputeInto<O> {
    fn impute_into(self) -> O;
}

impl<T> ImputeInto<T> for T {
    fn impute_into(self) -> T {
        self
    }
}

macro_rules! impl_impute_into_f64 {
    ($($ty:ty),+) => {
        $(
            impl ImputeInto<f64> for $ty {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn impute_into(self) -> f64 {
                    self as f64
                }
            }
        )+
    };
}

impl_impute_into_f64!(i8, i16, i32, i64, u8, u16, u32, u64, f32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option() {
        assert!(Option::<i32>::null().is_null());
        assert_eq!(Some(3).nullable_value(), Some(3));
        assert_eq!(None::<String>.nullable_value(), None);
    }

    #[test]
    fn test_float() {
        assert!(f64::null().is_nan());
        assert!(f32::NAN.is_null());
        assert!(!0.0_f64.is_null());
        assert_eq!(1.5_f64.nullable_value(), Some(1.5));
        assert_eq!(f64::NAN.nullable_value(), None);
    }

    #[test]
    fn test_impute_into() {
        let widened: f64 = 3_i32.impute_into();
        assert!((widened - 3.0).abs() < f64::EPSILON);
        let same: String = "a".to_owned().impute_into();
        assert_eq!(same, "a");
    }
}
