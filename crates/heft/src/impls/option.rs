use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, Shape};

// Option: the nullable container. An absent value contributes nothing; a
// freestanding `None` still occupies the container's own inline bytes.

fn option_get<T: Inspect>(value: &dyn Inspect) -> Option<&dyn Inspect> {
    value
        .as_any()
        .downcast_ref::<Option<T>>()
        .and_then(|option| option.as_ref().map(|inner| inner as &dyn Inspect))
}

impl<T: Inspect> Inspect for Option<T> {
    fn shape() -> &'static Shape {
        shape::intern::<Option<T>>(|| Shape::nullable::<Option<T>>(T::shape, option_get::<T>))
    }

    inspect_methods!();
}

#[cfg(test)]
mod test_option_types {
    use crate::engine::{Mode, Profiler};
    use crate::layout::{ALLOCATION_OVERHEAD, POINTER_BYTE_SIZE};

    #[test]
    fn test_none() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&None::<Box<u64>>),
            POINTER_BYTE_SIZE
        );
    }

    #[test]
    fn test_some() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&Some(Box::new(1u64))),
            POINTER_BYTE_SIZE + ALLOCATION_OVERHEAD + 8
        );
    }

    #[test]
    fn test_some_scalar() {
        let profiler = Profiler::new(Mode::Graph);
        assert_eq!(
            profiler.size_of(&Some(1u32)),
            std::mem::size_of::<Option<u32>>()
        );
    }
}
