use proptest::prelude::*;
use proptest::sample::select;
use strum::VariantArray;

use crate::*;

pub fn numeric_type() -> impl Strategy<Value = NumericType> {
    select(NumericType::VARIANTS)
}

pub fn backend() -> impl Strategy<Value = Backend> {
    select(Backend::VARIANTS)
}
