//! Property-based tests for the boundary model.

use nnrt_core::{Attribute, CoreError, DType, Format, Shape, Tensor, MAX_DIMS};
use proptest::prelude::*;

fn dims_strategy(max_rank: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(1u32..6, 1..=max_rank)
}

fn fixed_width_dtype() -> impl Strategy<Value = DType> {
    prop::sample::select(
        DType::ALL
            .iter()
            .copied()
            .filter(|d| d.size_of().is_some())
            .collect::<Vec<_>>(),
    )
}

proptest! {
    #[test]
    fn test_shape_keeps_dims_in_order(dims in dims_strategy(MAX_DIMS)) {
        let shape = Shape::new(&dims).unwrap();
        prop_assert_eq!(shape.dims(), dims.as_slice());
        let product: usize = dims.iter().map(|&d| d as usize).product();
        prop_assert_eq!(shape.element_count(), product);
    }

    #[test]
    fn test_shape_rejects_rank_above_limit(extra in 1usize..4) {
        let dims = vec![1u32; MAX_DIMS + extra];
        let is_shape_error = matches!(Shape::new(&dims), Err(CoreError::InvalidTensorShape { .. }));
        prop_assert!(is_shape_error);
    }

    #[test]
    fn test_exact_buffer_length_is_accepted(
        dims in dims_strategy(MAX_DIMS),
        dtype in fixed_width_dtype(),
        format_index in 0usize..6,
    ) {
        let format = Format::ALL[format_index];
        let probe = Tensor::new_with_shape("t", &dims, format, dtype).unwrap();
        let len = probe.expected_byte_len().unwrap().unwrap();

        let tensor = Tensor::from_bytes("t", &dims, format, dtype, vec![0xAB; len]).unwrap();
        prop_assert_eq!(tensor.data().len(), len);
        prop_assert_eq!(tensor.shape().dims(), dims.as_slice());
        prop_assert_eq!(tensor.format(), format);
        prop_assert_eq!(tensor.dtype(), dtype);

        let short = Tensor::from_bytes("t", &dims, format, dtype, vec![0; len - 1]);
        let is_shape_error = matches!(short, Err(CoreError::InvalidTensorShape { .. }));
        prop_assert!(is_shape_error);
    }

    #[test]
    fn test_int_attribute_accessors(value in any::<i64>()) {
        let attr = Attribute::int("k", value);
        prop_assert_eq!(attr.as_int().unwrap(), value);
        prop_assert!(attr.as_float().is_err());
        prop_assert!(attr.as_ints().is_err());
    }

    #[test]
    fn test_list_attribute_accessors(
        ints in prop::collection::vec(any::<i64>(), 0..16),
        strings in prop::collection::vec("[a-z]{0,8}", 0..8),
    ) {
        let ints_attr = Attribute::ints("i", ints.clone());
        prop_assert_eq!(ints_attr.as_ints().unwrap(), ints.as_slice());
        let strings_attr = Attribute::strings("s", strings.clone());
        prop_assert_eq!(
            strings_attr.as_strings().unwrap(),
            strings.as_slice()
        );
    }
}
