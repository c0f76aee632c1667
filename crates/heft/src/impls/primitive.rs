use once_cell::sync::OnceCell;

use crate::impls::inspect_methods;
use crate::shape::{Inspect, Shape};

// Primitive types: inline bytes, no children. Each keeps its shape in a
// per-type static, so resolving it is a single initialized-check.
macro_rules! impl_inspect_for_scalars {
    ( $( $ty:ty ),+ $(,)? ) => {
        $(
            impl Inspect for $ty {
                fn shape() -> &'static Shape {
                    static SHAPE: OnceCell<Shape> = OnceCell::new();
                    SHAPE.get_or_init(Shape::scalar::<$ty>)
                }

                inspect_methods!();
            }
        )+
    };
}

impl_inspect_for_scalars!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
);

#[cfg(test)]
mod test_primitive_types {
    use crate::engine::{Mode, Profiler};
    use crate::shape::{Inspect, ShapeKind};

    #[test]
    fn test_scalar_shapes() {
        assert!(matches!(u8::shape().kind(), ShapeKind::Scalar));
        assert!(matches!(f64::shape().kind(), ShapeKind::Scalar));
        assert_eq!(u8::shape().stride(), 1);
        assert_eq!(i128::shape().stride(), 16);
        assert_eq!(char::shape().stride(), 4);
    }

    #[test]
    fn test_scalar_sizes() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(profiler.size_of(&1i8), 1);
        assert_eq!(profiler.size_of(&1isize), std::mem::size_of::<isize>());
        assert_eq!(profiler.size_of(&1.0f32), 4);
        assert_eq!(profiler.size_of(&false), 1);
    }

    #[test]
    fn test_shape_is_unique_per_type() {
        assert!(std::ptr::eq(u32::shape(), u32::shape()));
        assert!(!std::ptr::eq(u32::shape(), i32::shape()));
    }
}
