use std::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI64, AtomicI8, AtomicIsize, AtomicPtr, AtomicU16,
    AtomicU32, AtomicU64, AtomicU8, AtomicUsize,
};
use std::sync::{Arc, Mutex, OnceLock, RwLock, TryLockError, Weak};

use once_cell::sync::OnceCell;

use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, Referent, Shape};

// Arc: same ownership model as Rc, one allocation shared by all clones.

fn arc_referent<'a, T: Inspect>(value: &'a dyn Inspect) -> Option<Referent<'a>> {
    value.as_any().downcast_ref::<Arc<T>>().map(|arc| Referent {
        address: Arc::as_ptr(arc) as *const (),
        value: &**arc as &dyn Inspect,
    })
}

impl<T: Inspect> Inspect for Arc<T> {
    fn shape() -> &'static Shape {
        shape::intern::<Arc<T>>(|| Shape::reference::<Arc<T>>(Some(T::shape), arc_referent::<T>))
    }

    inspect_methods!();
}

impl<T: Inspect> Inspect for Weak<T> {
    fn shape() -> &'static Shape {
        shape::intern::<Weak<T>>(Shape::pointer::<Weak<T>>)
    }

    inspect_methods!();
}

// Lock types: the interior is visited through a non-blocking acquire. A
// contended lock contributes only its inline bytes; blocking inside a size
// query is never acceptable.

fn mutex_with<T: Inspect>(value: &dyn Inspect, f: &mut dyn FnMut(&dyn Inspect) -> usize) -> usize {
    match value.as_any().downcast_ref::<Mutex<T>>() {
        Some(mutex) => match mutex.try_lock() {
            Ok(guard) => f(&*guard),
            Err(TryLockError::Poisoned(poisoned)) => f(&*poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => 0,
        },
        None => 0,
    }
}

impl<T: Inspect> Inspect for Mutex<T> {
    fn shape() -> &'static Shape {
        shape::intern::<Mutex<T>>(|| Shape::wrapper::<Mutex<T>>(mutex_with::<T>))
    }

    inspect_methods!();
}

fn rw_lock_with<T: Inspect>(
    value: &dyn Inspect,
    f: &mut dyn FnMut(&dyn Inspect) -> usize,
) -> usize {
    match value.as_any().downcast_ref::<RwLock<T>>() {
        Some(lock) => match lock.try_read() {
            Ok(guard) => f(&*guard),
            Err(TryLockError::Poisoned(poisoned)) => f(&*poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => 0,
        },
        None => 0,
    }
}

impl<T: Inspect> Inspect for RwLock<T> {
    fn shape() -> &'static Shape {
        shape::intern::<RwLock<T>>(|| Shape::wrapper::<RwLock<T>>(rw_lock_with::<T>))
    }

    inspect_methods!();
}

// OnceLock: a deferred result, absent until initialized.

fn once_lock_get<T: Inspect>(value: &dyn Inspect) -> Option<&dyn Inspect> {
    value
        .as_any()
        .downcast_ref::<OnceLock<T>>()
        .and_then(|cell| cell.get().map(|inner| inner as &dyn Inspect))
}

impl<T: Inspect> Inspect for OnceLock<T> {
    fn shape() -> &'static Shape {
        shape::intern::<OnceLock<T>>(|| {
            Shape::deferred::<OnceLock<T>>(T::shape, once_lock_get::<T>)
        })
    }

    inspect_methods!();
}

// Atomic types.
macro_rules! impl_inspect_for_atomics {
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

impl_inspect_for_atomics!(
    AtomicBool, AtomicI8, AtomicI16, AtomicI32, AtomicI64, AtomicIsize, AtomicU8, AtomicU16,
    AtomicU32, AtomicU64, AtomicUsize,
);

impl<T: 'static> Inspect for AtomicPtr<T> {
    fn shape() -> &'static Shape {
        shape::intern::<AtomicPtr<T>>(Shape::pointer::<AtomicPtr<T>>)
    }

    inspect_methods!();
}

#[cfg(test)]
mod test_sync_types {
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex, OnceLock, RwLock};

    use crate::engine::{Mode, Profiler};
    use crate::layout::{ALLOCATION_OVERHEAD, POINTER_BYTE_SIZE};

    #[test]
    fn test_arc() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&Arc::new(1u64)),
            POINTER_BYTE_SIZE + ALLOCATION_OVERHEAD + 8
        );
    }

    #[test]
    fn test_mutex_interior_is_visited() {
        let profiler = Profiler::new(Mode::Graph);
        let mutex = Mutex::new(Box::new(1u64));

        let inline = std::mem::size_of::<Mutex<Box<u64>>>();
        assert_eq!(
            profiler.size_of(&mutex),
            inline + ALLOCATION_OVERHEAD + 8
        );
    }

    #[test]
    fn test_contended_mutex_contributes_inline_bytes_only() {
        let profiler = Profiler::new(Mode::Graph);
        let mutex = Mutex::new(Box::new(1u64));

        let _guard = mutex.lock().unwrap();
        assert_eq!(
            profiler.size_of(&mutex),
            std::mem::size_of::<Mutex<Box<u64>>>()
        );
    }

    #[test]
    fn test_rw_lock() {
        let profiler = Profiler::new(Mode::Graph);
        let lock = RwLock::new(String::from("ab"));
        assert_eq!(
            profiler.size_of(&lock),
            std::mem::size_of::<RwLock<String>>() + ALLOCATION_OVERHEAD + 2
        );
    }

    #[test]
    fn test_once_lock() {
        let profiler = Profiler::new(Mode::Graph);
        let cell: OnceLock<Box<u64>> = OnceLock::new();
        let empty = profiler.size_of(&cell);
        assert_eq!(empty, std::mem::size_of::<OnceLock<Box<u64>>>());

        cell.set(Box::new(1)).unwrap();
        assert_eq!(profiler.size_of(&cell), empty + ALLOCATION_OVERHEAD + 8);
    }

    #[test]
    fn test_atomic() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&AtomicUsize::new(1)),
            std::mem::size_of::<AtomicUsize>()
        );
    }
}
