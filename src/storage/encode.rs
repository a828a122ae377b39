// Copyright 2022 RisingLight Project Authors. Licensed under Apache-2.0.

use std::fmt::Debug;

use bytes::{Buf, BufMut};

/// Encode a primitive value into fixed-width buffer
pub trait PrimitiveFixedWidthEncode:
    Copy + Clone + 'static + Send + Sync + PartialEq + PartialOrd + Debug
{
    /// Width of each element
    const WIDTH: usize;

    /// The designated null value.
    const NULL: Self;

    /// Type name, used in error messages and layout reports.
    const NAME: &'static str;

    /// Encode current primitive data to the end of an `Vec<u8>`.
    fn encode(&self, buffer: &mut impl BufMut);

    /// Decode a data from a bytes array.
    fn decode(buffer: &mut impl Buf) -> Self;

    fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Widen into the accumulator type used by delta coding.
    /// Returns `None` for types delta coding does not apply to.
    fn to_i128(self) -> Option<i128>;

    /// Narrow a value previously produced by [`to_i128`](Self::to_i128).
    fn from_i128(value: i128) -> Self;

    /// Native width in bits.
    fn native_bits() -> u32 {
        (Self::WIDTH * 8) as u32
    }
}

macro_rules! impl_signed_encode {
    ($($ty:ty, $name:expr, $put:ident, $get:ident, $delta:expr);* $(;)?) => {
        $(
            impl PrimitiveFixedWidthEncode for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                const NULL: Self = <$ty>::MIN;
                const NAME: &'static str = $name;

                fn encode(&self, buffer: &mut impl BufMut) {
                    buffer.$put(*self);
                }

                fn decode(buffer: &mut impl Buf) -> Self {
                    buffer.$get()
                }

                fn to_i128(self) -> Option<i128> {
                    $delta.then_some(self as i128)
                }

                fn from_i128(value: i128) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

// i8 leaves at most three bits per code below half its width, never worth a delta block.
impl_signed_encode! {
    i8, "i8", put_i8, get_i8, false;
    i16, "i16", put_i16_le, get_i16_le, true;
    i32, "i32", put_i32_le, get_i32_le, true;
    i64, "i64", put_i64_le, get_i64_le, true;
    i128, "i128", put_i128_le, get_i128_le, true;
}

impl PrimitiveFixedWidthEncode for f64 {
    const WIDTH: usize = std::mem::size_of::<f64>();
    const NULL: Self = f64::NAN;
    const NAME: &'static str = "f64";

    fn encode(&self, buffer: &mut impl BufMut) {
        buffer.put_f64_le(*self);
    }

    fn decode(buffer: &mut impl Buf) -> Self {
        buffer.get_f64_le()
    }

    fn is_null(&self) -> bool {
        self.is_nan()
    }

    fn to_i128(self) -> Option<i128> {
        None
    }

    fn from_i128(value: i128) -> Self {
        value as f64
    }
}
