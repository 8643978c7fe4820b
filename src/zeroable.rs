use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::mem::MaybeUninit;
use std::num::Wrapping;
use std::ptr::NonNull;

/// Types for which a value made of all-zero bytes is valid.
///
/// [`Arena::alloc_value`](crate::Arena::alloc_value) and
/// [`Arena::alloc_slice`](crate::Arena::alloc_slice) produce values of such
/// types by zero-filling arena memory.
///
/// # Safety
///
/// Implementing this trait asserts that the all-zero bit pattern is a valid,
/// initialized `Self`. Plain-data structs whose fields are all `Zeroable` can
/// implement it; types holding references, `NonNull`, `Box` or enums without
/// a zero discriminant cannot.
pub unsafe trait Zeroable: Sized {}

macro_rules! impl_zeroable {
    ($($t:ty),* $(,)?) => {
        $(unsafe impl Zeroable for $t {})*
    };
}

impl_zeroable!(
    (), bool, char,
    u8, u16, u32, u64, u128, usize,
    i8, i16, i32, i64, i128, isize,
    f32, f64,
);

unsafe impl<T> Zeroable for *const T {}
unsafe impl<T> Zeroable for *mut T {}
unsafe impl<T> Zeroable for Option<NonNull<T>> {}
unsafe impl<T> Zeroable for Option<&T> {}
unsafe impl<T> Zeroable for Option<&mut T> {}
unsafe impl<T: ?Sized> Zeroable for PhantomData<T> {}
unsafe impl<T> Zeroable for MaybeUninit<T> {}
unsafe impl<T: Zeroable> Zeroable for Wrapping<T> {}
unsafe impl<T: Zeroable> Zeroable for Cell<T> {}
unsafe impl<T: Zeroable> Zeroable for UnsafeCell<T> {}
unsafe impl<T: Zeroable, const N: usize> Zeroable for [T; N] {}

macro_rules! impl_zeroable_tuple {
    ($($name:ident),+) => {
        unsafe impl<$($name: Zeroable),+> Zeroable for ($($name,)+) {}
    };
}

impl_zeroable_tuple!(A);
impl_zeroable_tuple!(A, B);
impl_zeroable_tuple!(A, B, C);
impl_zeroable_tuple!(A, B, C, D);
impl_zeroable_tuple!(A, B, C, D, E);
impl_zeroable_tuple!(A, B, C, D, E, F);
