use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, Shape};

// Result: exactly one of two interiors is live; visit whichever it is.

fn result_with<T: Inspect, E: Inspect>(
    value: &dyn Inspect,
    f: &mut dyn FnMut(&dyn Inspect) -> usize,
) -> usize {
    match value.as_any().downcast_ref::<Result<T, E>>() {
        Some(Ok(inner)) => f(inner),
        Some(Err(error)) => f(error),
        None => 0,
    }
}

impl<T: Inspect, E: Inspect> Inspect for Result<T, E> {
    fn shape() -> &'static Shape {
        shape::intern::<Result<T, E>>(|| Shape::wrapper::<Result<T, E>>(result_with::<T, E>))
    }

    inspect_methods!();
}

#[cfg(test)]
mod test_result_types {
    use crate::engine::{Mode, Profiler};
    use crate::layout::ALLOCATION_OVERHEAD;

    #[test]
    fn test_both_variants_are_visited() {
        let profiler = Profiler::new(Mode::Graph);
        let inline = std::mem::size_of::<Result<String, Box<u64>>>();

        let ok: Result<String, Box<u64>> = Ok(String::from("abc"));
        assert_eq!(profiler.size_of(&ok), inline + ALLOCATION_OVERHEAD + 3);

        let err: Result<String, Box<u64>> = Err(Box::new(1));
        assert_eq!(profiler.size_of(&err), inline + ALLOCATION_OVERHEAD + 8);
    }
}
