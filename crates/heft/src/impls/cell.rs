use std::cell::{Cell, OnceCell, RefCell, UnsafeCell};

use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, Shape};

// Cell types. `Cell` and `UnsafeCell` expose no borrow of their interior, so
// only their inline bytes are counted; `RefCell` tracks borrows at runtime
// and its interior is visited through a non-panicking borrow.

impl<T: 'static> Inspect for Cell<T> {
    fn shape() -> &'static Shape {
        shape::intern::<Cell<T>>(Shape::scalar::<Cell<T>>)
    }

    inspect_methods!();
}

impl<T: 'static> Inspect for UnsafeCell<T> {
    fn shape() -> &'static Shape {
        shape::intern::<UnsafeCell<T>>(Shape::opaque::<UnsafeCell<T>>)
    }

    inspect_methods!();
}

fn ref_cell_with<T: Inspect>(
    value: &dyn Inspect,
    f: &mut dyn FnMut(&dyn Inspect) -> usize,
) -> usize {
    match value.as_any().downcast_ref::<RefCell<T>>() {
        // A mutably borrowed interior is skipped rather than panicked on.
        Some(cell) => match cell.try_borrow() {
            Ok(inner) => f(&*inner),
            Err(_) => 0,
        },
        None => 0,
    }
}

impl<T: Inspect> Inspect for RefCell<T> {
    fn shape() -> &'static Shape {
        shape::intern::<RefCell<T>>(|| Shape::wrapper::<RefCell<T>>(ref_cell_with::<T>))
    }

    inspect_methods!();
}

fn cell_get<T: Inspect>(value: &dyn Inspect) -> Option<&dyn Inspect> {
    value
        .as_any()
        .downcast_ref::<OnceCell<T>>()
        .and_then(|cell| cell.get().map(|inner| inner as &dyn Inspect))
}

impl<T: Inspect> Inspect for OnceCell<T> {
    fn shape() -> &'static Shape {
        shape::intern::<OnceCell<T>>(|| Shape::deferred::<OnceCell<T>>(T::shape, cell_get::<T>))
    }

    inspect_methods!();
}

fn sync_cell_get<T: Inspect>(value: &dyn Inspect) -> Option<&dyn Inspect> {
    value
        .as_any()
        .downcast_ref::<once_cell::sync::OnceCell<T>>()
        .and_then(|cell| cell.get().map(|inner| inner as &dyn Inspect))
}

impl<T: Inspect> Inspect for once_cell::sync::OnceCell<T> {
    fn shape() -> &'static Shape {
        shape::intern::<once_cell::sync::OnceCell<T>>(|| {
            Shape::deferred::<once_cell::sync::OnceCell<T>>(T::shape, sync_cell_get::<T>)
        })
    }

    inspect_methods!();
}

#[cfg(test)]
mod test_cell_types {
    use std::cell::{Cell, OnceCell, RefCell, UnsafeCell};

    use crate::engine::{Mode, Profiler};
    use crate::layout::ALLOCATION_OVERHEAD;

    #[test]
    fn test_cell() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&Cell::new(1u64)),
            std::mem::size_of::<Cell<u64>>()
        );
    }

    #[test]
    fn test_unsafe_cell() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&UnsafeCell::new(1u8)),
            std::mem::size_of::<UnsafeCell<u8>>()
        );
    }

    #[test]
    fn test_ref_cell_interior_is_visited() {
        let profiler = Profiler::new(Mode::Graph);
        let cell = RefCell::new(String::from("abc"));
        assert_eq!(
            profiler.size_of(&cell),
            std::mem::size_of::<RefCell<String>>() + ALLOCATION_OVERHEAD + 3
        );
    }

    #[test]
    fn test_mutably_borrowed_ref_cell_is_skipped() {
        let profiler = Profiler::new(Mode::Graph);
        let cell = RefCell::new(String::from("abc"));

        let _borrow = cell.borrow_mut();
        assert_eq!(
            profiler.size_of(&cell),
            std::mem::size_of::<RefCell<String>>()
        );
    }

    #[test]
    fn test_once_cells() {
        let profiler = Profiler::new(Mode::Graph);

        let std_cell: OnceCell<Box<u64>> = OnceCell::new();
        let empty = profiler.size_of(&std_cell);
        std_cell.set(Box::new(1)).unwrap();
        assert_eq!(profiler.size_of(&std_cell), empty + ALLOCATION_OVERHEAD + 8);

        let sync_cell: once_cell::sync::OnceCell<Box<u64>> = once_cell::sync::OnceCell::new();
        let empty = profiler.size_of(&sync_cell);
        sync_cell.set(Box::new(1)).unwrap();
        assert_eq!(
            profiler.size_of(&sync_cell),
            empty + ALLOCATION_OVERHEAD + 8
        );
    }
}
