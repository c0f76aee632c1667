use std::rc::{Rc, Weak};

use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, Referent, Shape};

// Rc: shared ownership, one allocation. All clones resolve to the same
// pointee address, so the visited-set collapses them to a single count.

fn rc_referent<'a, T: Inspect>(value: &'a dyn Inspect) -> Option<Referent<'a>> {
    value.as_any().downcast_ref::<Rc<T>>().map(|rc| Referent {
        address: Rc::as_ptr(rc) as *const (),
        value: &**rc as &dyn Inspect,
    })
}

impl<T: Inspect> Inspect for Rc<T> {
    fn shape() -> &'static Shape {
        shape::intern::<Rc<T>>(|| Shape::reference::<Rc<T>>(Some(T::shape), rc_referent::<T>))
    }

    inspect_methods!();
}

// Weak does not own its pointee and is the usual back-edge in cyclic
// structures; it stays a bare pointer.
impl<T: Inspect> Inspect for Weak<T> {
    fn shape() -> &'static Shape {
        shape::intern::<Weak<T>>(Shape::pointer::<Weak<T>>)
    }

    inspect_methods!();
}

#[cfg(test)]
mod test_rc_types {
    use std::rc::Rc;

    use crate::engine::{Mode, Profiler};
    use crate::layout::{ALLOCATION_OVERHEAD, POINTER_BYTE_SIZE};

    #[test]
    fn test_rc() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&Rc::new(1u64)),
            POINTER_BYTE_SIZE + ALLOCATION_OVERHEAD + 8
        );
    }

    #[test]
    fn test_cloned_rc_is_deduplicated() {
        let profiler = Profiler::new(Mode::Graph);
        let rc = Rc::new(1u64);
        let pair = (Rc::clone(&rc), Rc::clone(&rc));
        assert_eq!(
            profiler.size_of(&pair),
            2 * POINTER_BYTE_SIZE + ALLOCATION_OVERHEAD + 8
        );
    }

    #[test]
    fn test_weak_is_not_followed() {
        let profiler = Profiler::new(Mode::Graph);
        let rc = Rc::new(1u64);
        let weak = Rc::downgrade(&rc);
        assert_eq!(profiler.size_of(&weak), POINTER_BYTE_SIZE);
    }
}
