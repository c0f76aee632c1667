//! `Inspect` implementations for std (and optionally `indexmap`) types.

mod boxed;
mod cell;
mod collection;
mod marker;
mod option;
mod primitive;
mod ptr;
mod rc;
mod result;
mod sequence;
mod string;
mod sync;
mod tuple;

/// The two `Inspect` methods every sized implementation spells the same way.
macro_rules! inspect_methods {
    () => {
        fn shape_of(&self) -> &'static crate::shape::Shape {
            <Self as crate::shape::Inspect>::shape()
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    };
}

pub(crate) use inspect_methods;
