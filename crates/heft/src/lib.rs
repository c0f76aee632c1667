//! Runtime memory footprint of arbitrary values.
//!
//! [`Profiler`] walks a value's object graph and returns the bytes it
//! retains: inline storage plus every heap allocation reachable through
//! owning references. Traversal semantics are picked per profiler with
//! [`Mode`]; the free [`size_of`] uses graph semantics, which deduplicates
//! shared objects and terminates on cycles.
//!
//! Types opt in through the [`Inspect`] trait, usually via
//! `#[derive(Inspect)]`.

mod detail;
mod engine;
mod fields;
mod impls;
mod layout;
mod plan;
pub mod shape;

pub use detail::SizeNode;
pub use engine::{Mode, ModeError, Profiler};
pub use fields::{fields_of, FieldDescriptor};
pub use layout::{layout_of, Category, TypeLayout, ALLOCATION_OVERHEAD, POINTER_BYTE_SIZE};
pub use shape::{Inspect, Shape, ShapeKind};

#[cfg(feature = "derive")]
pub use heft_derive::Inspect;

// Generated code needs a stable path to these; not public API.
#[doc(hidden)]
pub mod __rt {
    pub use once_cell::sync::OnceCell;
}

/// Footprint of `value` in bytes, with graph semantics.
pub fn size_of<T: Inspect>(value: &T) -> usize {
    Profiler::new(Mode::Graph).size_of(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_of_helper() {
        assert_eq!(
            size_of(&String::from("abc")),
            std::mem::size_of::<String>() + ALLOCATION_OVERHEAD + 3
        );
    }

    #[test]
    fn test_size_of_helper_deduplicates() {
        let shared = std::sync::Arc::new(vec![0u8; 32]);
        let pair = (std::sync::Arc::clone(&shared), std::sync::Arc::clone(&shared));
        assert_eq!(
            size_of(&pair),
            size_of(&shared) + POINTER_BYTE_SIZE
        );
    }
}
