//! Compile-time tuple projections.
//!
//! - [`Pick`] selects one element and borrows it
//! - [`Pick2`] and [`Pick3`] build a new sub-tuple in the listed index order
//!
//! Tuples up to six elements are supported. Filter outputs are flattened onto the input with
//! [`TupleConcat`], after [`IntoTuple`] has made a 1-tuple of any non-tuple output.

use std::{borrow::Cow, fmt, marker::PhantomData};

/// Access to the `I`-th element of a tuple.
pub trait TupleIndex<const I: usize> {
    type Output;

    fn get(&self) -> &Self::Output;
}

macro_rules! impl_tuple_index {
    (@one ($($T:ident),+); $idx:tt => $Out:ident) => {
        impl<$($T),+> TupleIndex<$idx> for ($($T,)+) {
            type Output = $Out;

            fn get(&self) -> &$Out {
                &self.$idx
            }
        }
    };
    ($generics:tt; $($idx:tt => $Out:ident),+) => {
        $(impl_tuple_index!(@one $generics; $idx => $Out);)+
    };
}

impl_tuple_index!((A); 0 => A);
impl_tuple_index!((A, B); 0 => A, 1 => B);
impl_tuple_index!((A, B, C); 0 => A, 1 => B, 2 => C);
impl_tuple_index!((A, B, C, D); 0 => A, 1 => B, 2 => C, 3 => D);
impl_tuple_index!((A, B, C, D, E); 0 => A, 1 => B, 2 => C, 3 => D, 4 => E);
impl_tuple_index!((A, B, C, D, E, F); 0 => A, 1 => B, 2 => C, 3 => D, 4 => E, 5 => F);

/// Views a transformer output as a tuple: tuples as they are, any other value as a 1-tuple.
pub trait IntoTuple {
    type Tuple;

    fn into_tuple(self) -> Self::Tuple;
}

macro_rules! impl_into_tuple_for_tuple {
    ($(($($T:ident),+)),+) => {
        $(
            impl<$($T),+> IntoTuple for ($($T,)+) {
                type Tuple = Self;

                fn into_tuple(self) -> Self {
                    self
                }
            }
        )+
    };
}

impl_into_tuple_for_tuple!((A), (A, B), (A, B, C), (A, B, C, D));

macro_rules! impl_into_tuple_for_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl IntoTuple for $ty {
                type Tuple = (Self,);

                fn into_tuple(self) -> (Self,) {
                    (self,)
                }
            }
        )+
    };
}

impl_into_tuple_for_value!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String,
);

impl<T> IntoTuple for Option<T> {
    type Tuple = (Self,);

    fn into_tuple(self) -> (Self,) {
        (self,)
    }
}

impl<T> IntoTuple for Vec<T> {
    type Tuple = (Self,);

    fn into_tuple(self) -> (Self,) {
        (self,)
    }
}

/// Concatenates two tuples into one flat tuple.
pub trait TupleConcat<Rhs> {
    type Output;

    fn concat(self, rhs: Rhs) -> Self::Output;
}

macro_rules! impl_tuple_concat {
    (@one ($($L:ident),+); ($($R:ident),+)) => {
        impl<$($L,)+ $($R),+> TupleConcat<($($R,)+)> for ($($L,)+) {
            type Output = ($($L,)+ $($R,)+);

            #[allow(non_snake_case)]
            fn concat(self, rhs: ($($R,)+)) -> Self::Output {
                let ($($L,)+) = self;
                let ($($R,)+) = rhs;
                ($($L,)+ $($R,)+)
            }
        }
    };
    ($lhs:tt; $($rhs:tt),+) => {
        $(impl_tuple_concat!(@one $lhs; $rhs);)+
    };
}

impl_tuple_concat!((A); (W), (W, X), (W, X, Y), (W, X, Y, Z));
impl_tuple_concat!((A, B); (W), (W, X), (W, X, Y), (W, X, Y, Z));
impl_tuple_concat!((A, B, C); (W), (W, X), (W, X, Y), (W, X, Y, Z));
impl_tuple_concat!((A, B, C, D); (W), (W, X), (W, X, Y), (W, X, Y, Z));
impl_tuple_concat!((A, B, C, D, E); (W), (W, X), (W, X, Y), (W, X, Y, Z));
impl_tuple_concat!((A, B, C, D, E, F); (W), (W, X), (W, X, Y), (W, X, Y, Z));

/// Selects the part of an input tuple a wrapped stage sees.
pub trait Projection<In> {
    type Output: Clone;

    fn project(input: &In) -> Cow<'_, Self::Output>;
}

/// Projects element `I`, by reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pick<const I: usize>;

/// Projects elements `I` and `J` into a new pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pick2<const I: usize, const J: usize>;

/// Projects elements `I`, `J` and `K` into a new triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pick3<const I: usize, const J: usize, const K: usize>;

impl<In, const I: usize> Projection<In> for Pick<I>
where
    In: TupleIndex<I>,
    <In as TupleIndex<I>>::Output: Clone,
{
    type Output = <In as TupleIndex<I>>::Output;

    fn project(input: &In) -> Cow<'_, Self::Output> {
        Cow::Borrowed(<In as TupleIndex<I>>::get(input))
    }
}

impl<In, const I: usize, const J: usize> Projection<In> for Pick2<I, J>
where
    In: TupleIndex<I> + TupleIndex<J>,
    <In as TupleIndex<I>>::Output: Clone,
    <In as TupleIndex<J>>::Output: Clone,
{
    type Output = (<In as TupleIndex<I>>::Output, <In as TupleIndex<J>>::Output);

    fn project(input: &In) -> Cow<'_, Self::Output> {
        Cow::Owned((
            <In as TupleIndex<I>>::get(input).clone(),
            <In as TupleIndex<J>>::get(input).clone(),
        ))
    }
}

impl<In, const I: usize, const J: usize, const K: usize> Projection<In> for Pick3<I, J, K>
where
    In: TupleIndex<I> + TupleIndex<J> + TupleIndex<K>,
    <In as TupleIndex<I>>::Output: Clone,
    <In as TupleIndex<J>>::Output: Clone,
    <In as TupleIndex<K>>::Output: Clone,
{
    type Output = (
        <In as TupleIndex<I>>::Output,
        <In as TupleIndex<J>>::Output,
        <In as TupleIndex<K>>::Output,
    );

    fn project(input: &In) -> Cow<'_, Self::Output> {
        Cow::Owned((
            <In as TupleIndex<I>>::get(input).clone(),
            <In as TupleIndex<J>>::get(input).clone(),
            <In as TupleIndex<K>>::get(input).clone(),
        ))
    }
}

/// Type-level marker tying a projection to its input type.
pub(crate) struct ProjectionMarker<In, P>(PhantomData<fn(&In) -> P>);

impl<In, P> ProjectionMarker<In, P> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<In, P> fmt::Debug for ProjectionMarker<In, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(std::any::type_name::<P>())
    }
}

impl<In, P> Clone for ProjectionMarker<In, P> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<In, P> PartialEq for ProjectionMarker<In, P> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}
