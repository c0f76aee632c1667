use std::ptr::NonNull;

use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, Shape};

// Pointer types: one address, never followed. Raw pointers carry no ownership
// and no liveness guarantee, so they never contribute the pointee's bytes.
impl<T: ?Sized + 'static> Inspect for *const T {
    fn shape() -> &'static Shape {
        shape::intern::<*const T>(Shape::pointer::<*const T>)
    }

    inspect_methods!();
}

impl<T: ?Sized + 'static> Inspect for *mut T {
    fn shape() -> &'static Shape {
        shape::intern::<*mut T>(Shape::pointer::<*mut T>)
    }

    inspect_methods!();
}

impl<T: ?Sized + 'static> Inspect for NonNull<T> {
    fn shape() -> &'static Shape {
        shape::intern::<NonNull<T>>(Shape::pointer::<NonNull<T>>)
    }

    inspect_methods!();
}
