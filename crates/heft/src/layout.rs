//! Type layout inspection.
//!
//! Sizes are discovered by probing synthetic instances rather than by
//! hard-coding packing rules: the distance between two same-typed neighbour
//! fields is the padded instance size, and field offsets are read off a
//! zero-initialized probe. Probe instances are `MaybeUninit`, so no
//! constructor and no `Drop` ever runs for them.

use std::any::TypeId;
use std::collections::HashMap;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::fields;
use crate::shape::{Shape, ShapeKind};

pub const POINTER_BYTE_SIZE: usize = if cfg!(target_pointer_width = "16") {
    2
} else if cfg!(target_pointer_width = "32") {
    4
} else {
    8
};

/// Modeled per-allocation identity overhead: one word of allocator
/// bookkeeping plus one word of alignment slack, charged to every heap
/// object the engine enters.
pub const ALLOCATION_OVERHEAD: usize = 2 * POINTER_BYTE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Value,
    SealedReference,
    PolymorphicReference,
}

/// Physical layout of one concrete type, computed at most once per process.
#[derive(Debug, Clone, Copy)]
pub struct TypeLayout {
    /// Size of one instance body, padding included. For polymorphic
    /// references the pointee layout is unknowable statically and this falls
    /// back to one word.
    pub instance_size: usize,
    /// Identity overhead; zero for value categories.
    pub overhead: usize,
    pub category: Category,
}

/// Two adjacent same-typed fields; the offset of the second one is the
/// alignment-padded size of `T`, decided by the compiler's own packing rules.
#[allow(dead_code)]
struct SizeComputer<T> {
    lo: T,
    hi: T,
}

pub(crate) fn stride_of<T>() -> usize {
    let probe = MaybeUninit::<SizeComputer<T>>::uninit();
    let base = probe.as_ptr();
    // Addresses only, nothing is read from the probe.
    unsafe {
        (ptr::addr_of!((*base).hi) as usize).abs_diff(ptr::addr_of!((*base).lo) as usize)
    }
}

pub(crate) fn round_to_word(size: usize) -> usize {
    (size + POINTER_BYTE_SIZE - 1) & !(POINTER_BYTE_SIZE - 1)
}

static LAYOUTS: Lazy<RwLock<HashMap<TypeId, TypeLayout>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static BODIES: Lazy<RwLock<HashMap<TypeId, usize>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Layout of the given shape: `(instance size, identity overhead, category)`.
pub fn layout_of(shape: &'static Shape) -> TypeLayout {
    if let Some(layout) = LAYOUTS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&shape.id())
    {
        return *layout;
    }

    let layout = compute_layout(shape);
    log::debug!(
        "layout of `{}`: {} bytes (+{} overhead)",
        shape.name(),
        layout.instance_size,
        layout.overhead
    );

    let mut layouts = LAYOUTS.write().unwrap_or_else(PoisonError::into_inner);
    *layouts.entry(shape.id()).or_insert(layout)
}

fn compute_layout(shape: &'static Shape) -> TypeLayout {
    match shape.kind() {
        ShapeKind::Reference(reference) => match reference.target {
            Some(target) => TypeLayout {
                instance_size: body_of(target()),
                overhead: ALLOCATION_OVERHEAD,
                category: Category::SealedReference,
            },
            None => TypeLayout {
                instance_size: POINTER_BYTE_SIZE,
                overhead: ALLOCATION_OVERHEAD,
                category: Category::PolymorphicReference,
            },
        },
        ShapeKind::Opaque => TypeLayout {
            instance_size: POINTER_BYTE_SIZE,
            overhead: 0,
            category: Category::Value,
        },
        _ => TypeLayout {
            instance_size: shape.stride(),
            overhead: 0,
            category: Category::Value,
        },
    }
}

/// Heap body size of a pointee: the furthest field's end, rounded up to the
/// word. Falls back to the word-rounded stride where per-field offsets are
/// not probeable, and to one bare word for opaque handles and empty bodies.
pub(crate) fn body_of(shape: &'static Shape) -> usize {
    if let Some(body) = BODIES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&shape.id())
    {
        return *body;
    }

    let body = compute_body(shape);

    let mut bodies = BODIES.write().unwrap_or_else(PoisonError::into_inner);
    *bodies.entry(shape.id()).or_insert(body)
}

fn compute_body(shape: &'static Shape) -> usize {
    match shape.kind() {
        ShapeKind::Opaque => POINTER_BYTE_SIZE,
        ShapeKind::Composite(_) => {
            let descriptors = fields::fields_of(shape);
            if descriptors.is_empty() {
                return POINTER_BYTE_SIZE;
            }

            let furthest = descriptors
                .iter()
                .filter_map(|field| field.offset.map(|offset| (offset, field.shape)))
                .max_by_key(|(offset, _)| *offset);

            match furthest {
                Some((offset, field_shape)) => round_to_word(offset + field_shape.stride()),
                // Offsets not probeable (enum variants): stride is exact.
                None => round_to_word(shape.stride()),
            }
        }
        _ => round_to_word(shape.stride()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Inspect;

    #[test]
    fn stride_matches_compiler_size() {
        assert_eq!(stride_of::<u8>(), 1);
        assert_eq!(stride_of::<u64>(), 8);
        assert_eq!(stride_of::<(u8, u32)>(), std::mem::size_of::<(u8, u32)>());
        assert_eq!(stride_of::<()>(), 0);
        assert_eq!(stride_of::<String>(), std::mem::size_of::<String>());
    }

    #[test]
    fn stride_includes_tail_padding() {
        // (u32, u8) pads to 8 so neighbours stay aligned.
        assert_eq!(stride_of::<(u32, u8)>(), std::mem::size_of::<(u32, u8)>());
    }

    #[test]
    fn rounding() {
        assert_eq!(round_to_word(0), 0);
        assert_eq!(round_to_word(1), POINTER_BYTE_SIZE);
        assert_eq!(round_to_word(POINTER_BYTE_SIZE), POINTER_BYTE_SIZE);
        assert_eq!(round_to_word(POINTER_BYTE_SIZE + 1), 2 * POINTER_BYTE_SIZE);
    }

    #[test]
    fn scalar_layout_is_value_category() {
        let layout = layout_of(u32::shape());
        assert_eq!(layout.instance_size, 4);
        assert_eq!(layout.overhead, 0);
        assert_eq!(layout.category, Category::Value);
    }

    #[test]
    fn sealed_reference_layout_carries_overhead() {
        let layout = layout_of(<Box<u64>>::shape());
        assert_eq!(layout.overhead, ALLOCATION_OVERHEAD);
        assert_eq!(layout.category, Category::SealedReference);
        assert_eq!(layout.instance_size, 8);
    }

    #[test]
    fn layout_is_cached() {
        let first = layout_of(u64::shape());
        let second = layout_of(u64::shape());
        assert_eq!(first.instance_size, second.instance_size);
    }
}
