use std::mem::MaybeUninit;
use std::ptr;

use crate::impls::inspect_methods;
use crate::shape::{self, FieldAccess, FieldDef, Inspect, OffsetsFn, Shape};

// Tuples: anonymous composites. Field offsets are probed off a synthetic
// instance; nothing is read from it and it is never dropped.
macro_rules! impl_inspect_for_tuples {
    ( $( $name:ident : $idx:tt ),+ $(,)? ) => {
        impl<$( $name: Inspect ),+> Inspect for ($( $name, )+) {
            fn shape() -> &'static Shape {
                shape::intern::<Self>(|| {
                    let offsets: OffsetsFn = || {
                        let probe = MaybeUninit::<($( $name, )+)>::uninit();
                        let base = probe.as_ptr();
                        unsafe {
                            vec![
                                $( (ptr::addr_of!((*base).$idx) as usize) - (base as usize), )+
                            ]
                        }
                    };

                    Shape::composite::<Self>(
                        vec![
                            $(
                                FieldDef {
                                    name: stringify!($idx),
                                    shape: $name::shape,
                                    access: {
                                        let access: FieldAccess = |value| {
                                            value
                                                .as_any()
                                                .downcast_ref::<Self>()
                                                .map(|tuple| &tuple.$idx as &dyn Inspect)
                                        };
                                        access
                                    },
                                },
                            )+
                        ],
                        Some(offsets),
                    )
                })
            }

            inspect_methods!();
        }
    };
}

impl_inspect_for_tuples!(A: 0);
impl_inspect_for_tuples!(A: 0, B: 1);
impl_inspect_for_tuples!(A: 0, B: 1, C: 2);
impl_inspect_for_tuples!(A: 0, B: 1, C: 2, D: 3);
impl_inspect_for_tuples!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_inspect_for_tuples!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_inspect_for_tuples!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_inspect_for_tuples!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_inspect_for_tuples!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_inspect_for_tuples!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
impl_inspect_for_tuples!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
impl_inspect_for_tuples!(
    A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11
);

#[cfg(test)]
mod test_tuple_types {
    use crate::engine::{Mode, Profiler};
    use crate::layout::ALLOCATION_OVERHEAD;

    #[test]
    fn test_scalar_tuple() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&(1u8, 2u32)),
            std::mem::size_of::<(u8, u32)>()
        );
    }

    #[test]
    fn test_tuple_with_references() {
        let profiler = Profiler::new(Mode::Graph);
        let value = (1u64, Box::new(2u64), String::from("abc"));
        assert_eq!(
            profiler.size_of(&value),
            std::mem::size_of::<(u64, Box<u64>, String)>()
                + (ALLOCATION_OVERHEAD + 8)
                + (ALLOCATION_OVERHEAD + 3)
        );
    }

    #[test]
    fn test_nested_tuple_is_flattened() {
        let profiler = Profiler::new(Mode::Graph);
        let nested = (1u8, (Box::new(2u64), 3u8));
        assert_eq!(
            profiler.size_of(&nested),
            std::mem::size_of::<(u8, (Box<u64>, u8))>() + ALLOCATION_OVERHEAD + 8
        );
    }

    #[test]
    fn test_large_arity() {
        let profiler = Profiler::new(Mode::Graph);
        let wide = (1u8, 2u8, 3u8, 4u8, 5u8, 6u8, 7u8, 8u8, 9u8, 10u8, 11u8, 12u8);
        assert_eq!(profiler.size_of(&wide), 12);
    }
}
