use std::ptr;

use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, SequenceShape, Shape};

// Sequence types. Heap-backed runs report their buffer address and length;
// inline arrays report no buffer, their slots already sit in the parent.

fn vec_len<T: Inspect>(value: &dyn Inspect) -> usize {
    value.as_any().downcast_ref::<Vec<T>>().map_or(0, Vec::len)
}

fn vec_buffer<T: Inspect>(value: &dyn Inspect) -> *const () {
    value
        .as_any()
        .downcast_ref::<Vec<T>>()
        .map_or(ptr::null(), |vec| vec.as_ptr() as *const ())
}

fn vec_each<'a, T: Inspect>(value: &'a dyn Inspect, f: &mut dyn FnMut(&'a dyn Inspect)) {
    if let Some(vec) = value.as_any().downcast_ref::<Vec<T>>() {
        for element in vec {
            f(element);
        }
    }
}

impl<T: Inspect> Inspect for Vec<T> {
    fn shape() -> &'static Shape {
        shape::intern::<Vec<T>>(|| {
            Shape::sequence::<Vec<T>>(SequenceShape {
                element: T::shape,
                len: vec_len::<T>,
                each: vec_each::<T>,
                buffer: Some(vec_buffer::<T>),
                uniform: true,
            })
        })
    }

    inspect_methods!();
}

fn boxed_slice_len<T: Inspect>(value: &dyn Inspect) -> usize {
    value
        .as_any()
        .downcast_ref::<Box<[T]>>()
        .map_or(0, |slice| slice.len())
}

fn boxed_slice_buffer<T: Inspect>(value: &dyn Inspect) -> *const () {
    value
        .as_any()
        .downcast_ref::<Box<[T]>>()
        .map_or(ptr::null(), |slice| slice.as_ptr() as *const ())
}

fn boxed_slice_each<'a, T: Inspect>(value: &'a dyn Inspect, f: &mut dyn FnMut(&'a dyn Inspect)) {
    if let Some(slice) = value.as_any().downcast_ref::<Box<[T]>>() {
        for element in slice.iter() {
            f(element);
        }
    }
}

impl<T: Inspect> Inspect for Box<[T]> {
    fn shape() -> &'static Shape {
        shape::intern::<Box<[T]>>(|| {
            Shape::sequence::<Box<[T]>>(SequenceShape {
                element: T::shape,
                len: boxed_slice_len::<T>,
                each: boxed_slice_each::<T>,
                buffer: Some(boxed_slice_buffer::<T>),
                uniform: true,
            })
        })
    }

    inspect_methods!();
}

fn slice_len<T: Inspect>(value: &dyn Inspect) -> usize {
    value
        .as_any()
        .downcast_ref::<&'static [T]>()
        .map_or(0, |slice| slice.len())
}

fn slice_buffer<T: Inspect>(value: &dyn Inspect) -> *const () {
    value
        .as_any()
        .downcast_ref::<&'static [T]>()
        .map_or(ptr::null(), |slice| slice.as_ptr() as *const ())
}

fn slice_each<'a, T: Inspect>(value: &'a dyn Inspect, f: &mut dyn FnMut(&'a dyn Inspect)) {
    if let Some(slice) = value.as_any().downcast_ref::<&'static [T]>() {
        for element in slice.iter() {
            f(element);
        }
    }
}

impl<T: Inspect> Inspect for &'static [T] {
    fn shape() -> &'static Shape {
        shape::intern::<&'static [T]>(|| {
            Shape::sequence::<&'static [T]>(SequenceShape {
                element: T::shape,
                len: slice_len::<T>,
                each: slice_each::<T>,
                buffer: Some(slice_buffer::<T>),
                uniform: true,
            })
        })
    }

    inspect_methods!();
}

fn array_len<T: Inspect, const N: usize>(_: &dyn Inspect) -> usize {
    N
}

fn array_each<'a, T: Inspect, const N: usize>(
    value: &'a dyn Inspect,
    f: &mut dyn FnMut(&'a dyn Inspect),
) {
    if let Some(array) = value.as_any().downcast_ref::<[T; N]>() {
        for element in array {
            f(element);
        }
    }
}

impl<T: Inspect, const N: usize> Inspect for [T; N] {
    fn shape() -> &'static Shape {
        shape::intern::<[T; N]>(|| {
            Shape::sequence::<[T; N]>(SequenceShape {
                element: T::shape,
                len: array_len::<T, N>,
                each: array_each::<T, N>,
                buffer: None,
                uniform: true,
            })
        })
    }

    inspect_methods!();
}

#[cfg(test)]
mod test_sequence_types {
    use crate::engine::{Mode, Profiler};
    use crate::layout::ALLOCATION_OVERHEAD;

    #[test]
    fn test_vec_of_scalars() {
        let profiler = Profiler::new(Mode::Graph);
        let inline = std::mem::size_of::<Vec<u32>>();
        assert_eq!(
            profiler.size_of(&vec![1u32, 2, 3]),
            inline + ALLOCATION_OVERHEAD + 3 * 4
        );
    }

    #[test]
    fn test_empty_vec() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&Vec::<u32>::new()),
            std::mem::size_of::<Vec<u32>>() + ALLOCATION_OVERHEAD
        );
    }

    #[test]
    fn test_vec_capacity_is_not_counted() {
        let profiler = Profiler::new(Mode::Graph);
        let mut vec = Vec::with_capacity(1024);
        vec.push(1u64);
        assert_eq!(
            profiler.size_of(&vec),
            std::mem::size_of::<Vec<u64>>() + ALLOCATION_OVERHEAD + 8
        );
    }

    #[test]
    fn test_vec_of_strings() {
        let profiler = Profiler::new(Mode::Graph);
        let vec = vec![String::from("a"), String::from("bc")];

        let inline = std::mem::size_of::<Vec<String>>();
        let slots = 2 * std::mem::size_of::<String>();
        let buffers = (ALLOCATION_OVERHEAD + 1) + (ALLOCATION_OVERHEAD + 2);
        assert_eq!(
            profiler.size_of(&vec),
            inline + ALLOCATION_OVERHEAD + slots + buffers
        );
    }

    #[test]
    fn test_inline_array() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(profiler.size_of(&[1u64, 2, 3]), 3 * 8);
    }

    #[test]
    fn test_inline_array_of_boxes() {
        let profiler = Profiler::new(Mode::Graph);
        let array = [Box::new(1u64), Box::new(2)];
        assert_eq!(
            profiler.size_of(&array),
            std::mem::size_of::<[Box<u64>; 2]>() + 2 * (ALLOCATION_OVERHEAD + 8)
        );
    }

    #[test]
    fn test_boxed_slice() {
        let profiler = Profiler::new(Mode::Graph);
        let slice: Box<[u16]> = vec![1u16, 2, 3, 4].into_boxed_slice();
        assert_eq!(
            profiler.size_of(&slice),
            std::mem::size_of::<Box<[u16]>>() + ALLOCATION_OVERHEAD + 4 * 2
        );
    }

    #[test]
    fn test_static_slice() {
        let profiler = Profiler::new(Mode::Graph);
        let slice: &'static [u32] = &[1, 2, 3];
        assert_eq!(
            profiler.size_of(&slice),
            std::mem::size_of::<&[u32]>() + ALLOCATION_OVERHEAD + 3 * 4
        );
    }
}
