use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, Referent, Shape};

// Box: an owning reference with its own allocation identity.

fn box_referent<'a, T: Inspect>(value: &'a dyn Inspect) -> Option<Referent<'a>> {
    value.as_any().downcast_ref::<Box<T>>().map(|boxed| Referent {
        address: &**boxed as *const T as *const (),
        value: &**boxed as &dyn Inspect,
    })
}

impl<T: Inspect> Inspect for Box<T> {
    fn shape() -> &'static Shape {
        shape::intern::<Box<T>>(|| Shape::reference::<Box<T>>(Some(T::shape), box_referent::<T>))
    }

    inspect_methods!();
}

fn dyn_box_referent(value: &dyn Inspect) -> Option<Referent<'_>> {
    value
        .as_any()
        .downcast_ref::<Box<dyn Inspect>>()
        .map(|boxed| Referent {
            address: &**boxed as *const dyn Inspect as *const (),
            value: &**boxed,
        })
}

// The pointee type is only known per value; its shape is resolved through the
// virtual `shape_of` call at traversal time.
impl Inspect for Box<dyn Inspect> {
    fn shape() -> &'static Shape {
        shape::intern::<Box<dyn Inspect>>(|| {
            Shape::reference::<Box<dyn Inspect>>(None, dyn_box_referent)
        })
    }

    inspect_methods!();
}
