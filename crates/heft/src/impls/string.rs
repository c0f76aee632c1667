use once_cell::sync::OnceCell;

use crate::impls::inspect_methods;
use crate::shape::{Inspect, Shape, TextBuf};

// Text types. The buffer contributes one byte per UTF-8 code unit; capacity
// slack is not counted. A zero-length text reports no trackable buffer
// address, its pointer dangles.

fn string_buffer(value: &dyn Inspect) -> Option<TextBuf> {
    value.as_any().downcast_ref::<String>().map(|string| TextBuf {
        address: string.as_ptr() as *const (),
        len: string.len(),
    })
}

impl Inspect for String {
    fn shape() -> &'static Shape {
        static SHAPE: OnceCell<Shape> = OnceCell::new();
        SHAPE.get_or_init(|| Shape::text::<String>(string_buffer))
    }

    inspect_methods!();
}

fn str_buffer(value: &dyn Inspect) -> Option<TextBuf> {
    value.as_any().downcast_ref::<&'static str>().map(|str| TextBuf {
        address: str.as_ptr() as *const (),
        len: str.len(),
    })
}

impl Inspect for &'static str {
    fn shape() -> &'static Shape {
        static SHAPE: OnceCell<Shape> = OnceCell::new();
        SHAPE.get_or_init(|| Shape::text::<&'static str>(str_buffer))
    }

    inspect_methods!();
}

fn boxed_str_buffer(value: &dyn Inspect) -> Option<TextBuf> {
    value.as_any().downcast_ref::<Box<str>>().map(|str| TextBuf {
        address: str.as_ptr() as *const (),
        len: str.len(),
    })
}

impl Inspect for Box<str> {
    fn shape() -> &'static Shape {
        static SHAPE: OnceCell<Shape> = OnceCell::new();
        SHAPE.get_or_init(|| Shape::text::<Box<str>>(boxed_str_buffer))
    }

    inspect_methods!();
}
