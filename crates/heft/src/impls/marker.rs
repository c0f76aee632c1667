use std::marker::PhantomData;

use once_cell::sync::OnceCell;

use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, Shape};

// Marker types: zero bytes, zero children.
impl Inspect for () {
    fn shape() -> &'static Shape {
        static SHAPE: OnceCell<Shape> = OnceCell::new();
        SHAPE.get_or_init(Shape::scalar::<()>)
    }

    inspect_methods!();
}

impl<T: ?Sized + 'static> Inspect for PhantomData<T> {
    fn shape() -> &'static Shape {
        shape::intern::<PhantomData<T>>(Shape::scalar::<PhantomData<T>>)
    }

    inspect_methods!();
}
