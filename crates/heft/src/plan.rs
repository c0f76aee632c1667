//! Sizing-plan synthesis.
//!
//! A [`Plan`] is the per-type sizing procedure: category dispatch, pointee
//! body sizes, element strides, reference-freedom analysis and the flattened
//! child-accessor paths are all resolved here, once per type, and baked into
//! the plan. Running a plan re-dispatches nothing; it only follows what was
//! baked. Plans hand every nested reference back to the engine session, which
//! is where deduplication and cycle policy live.

use crate::fields;
use crate::layout;
use crate::shape::{
    BufferFn, EachFn, FieldAccess, LenFn, ReferentFn, Shape, ShapeKind, TextFn, WithFn,
};

/// A child of a composite that can contribute heap bytes, reached through a
/// path of accessors (one hop per flattened value-typed level).
pub(crate) struct ChildSlot {
    pub(crate) path: Box<[FieldAccess]>,
    pub(crate) shape: &'static Shape,
}

/// The compiled sizing procedure for one shape. Computes a value's heap
/// contribution: the bytes it owns beyond its inline stride, which the
/// parent has already counted.
pub(crate) enum Plan {
    /// No heap contribution at all (scalars, pointers, opaque handles,
    /// reference-free composites and inline arrays). The fast leaf case.
    Leaf,
    Text {
        buffer: TextFn,
    },
    Composite {
        children: Box<[ChildSlot]>,
    },
    /// Reference with a statically-known pointee: body size precomputed.
    Sealed {
        referent: ReferentFn,
        pointee: &'static Shape,
        body: usize,
    },
    /// Reference with a `dyn` pointee: concrete shape resolved per value.
    Virtual {
        referent: ReferentFn,
    },
    /// Heap sequence whose elements carry no references: one multiply, no
    /// per-element loop.
    PackedSeq {
        len: LenFn,
        buffer: BufferFn,
        elem_size: usize,
    },
    /// Heap sequence whose elements must be walked. `elem` is the element
    /// shape when every yielded value has it, `None` when the sequence
    /// yields mixed types (maps) and the runtime shape must be asked.
    DeepSeq {
        len: LenFn,
        each: EachFn,
        buffer: BufferFn,
        slot: usize,
        elem: Option<&'static Shape>,
    },
    /// Inline array with reference-carrying elements: element contributions
    /// only, the slots themselves sit in the parent.
    InlineSeq {
        each: EachFn,
        elem: Option<&'static Shape>,
    },
    Optional {
        get: FieldAccess,
        inner: &'static Shape,
    },
    Deferred {
        get: FieldAccess,
        inner: &'static Shape,
    },
    Wrapper {
        with: WithFn,
    },
}

pub(crate) fn synthesize(shape: &'static Shape) -> Plan {
    log::debug!("synthesizing sizing plan for `{}`", shape.name());

    match shape.kind() {
        ShapeKind::Scalar | ShapeKind::Pointer | ShapeKind::Opaque => Plan::Leaf,
        ShapeKind::Text(buffer) => Plan::Text { buffer: *buffer },
        ShapeKind::Composite(_) => {
            let mut children = Vec::new();
            flatten_into(shape, &mut Vec::new(), &mut children);
            if children.is_empty() {
                Plan::Leaf
            } else {
                Plan::Composite {
                    children: children.into_boxed_slice(),
                }
            }
        }
        ShapeKind::Reference(reference) => match reference.target {
            Some(target) => {
                let pointee = target();
                Plan::Sealed {
                    referent: reference.referent,
                    pointee,
                    body: layout::body_of(pointee),
                }
            }
            None => Plan::Virtual {
                referent: reference.referent,
            },
        },
        ShapeKind::Nullable(projection) => Plan::Optional {
            get: projection.get,
            inner: (projection.inner)(),
        },
        ShapeKind::Deferred(projection) => Plan::Deferred {
            get: projection.get,
            inner: (projection.inner)(),
        },
        ShapeKind::Sequence(sequence) => {
            let element = (sequence.element)();
            let elem = sequence.uniform.then_some(element);
            match sequence.buffer {
                None => {
                    if has_no_references(element) {
                        Plan::Leaf
                    } else {
                        Plan::InlineSeq {
                            each: sequence.each,
                            elem,
                        }
                    }
                }
                Some(buffer) => {
                    if has_no_references(element) {
                        Plan::PackedSeq {
                            len: sequence.len,
                            buffer,
                            elem_size: element.stride(),
                        }
                    } else {
                        Plan::DeepSeq {
                            len: sequence.len,
                            each: sequence.each,
                            buffer,
                            slot: element.stride(),
                            elem,
                        }
                    }
                }
            }
        }
        ShapeKind::Wrapper(wrapper) => Plan::Wrapper { with: wrapper.with },
    }
}

/// Collects the reference-carrying storage fields of `shape`, flattening
/// through nested value-typed fields; primitives and pointers are skipped,
/// their bytes already sit inside the instance stride.
fn flatten_into(
    shape: &'static Shape,
    path: &mut Vec<FieldAccess>,
    out: &mut Vec<ChildSlot>,
) {
    for field in fields::fields_of(shape) {
        match field.shape.kind() {
            ShapeKind::Scalar | ShapeKind::Pointer | ShapeKind::Opaque => {}
            ShapeKind::Composite(_) => {
                path.push(field.access);
                flatten_into(field.shape, path, out);
                path.pop();
            }
            _ => {
                let mut full = path.clone();
                full.push(field.access);
                out.push(ChildSlot {
                    path: full.into_boxed_slice(),
                    shape: field.shape,
                });
            }
        }
    }
}

/// Whether instances of `shape` can ever point at other heap data. Decides
/// the packed (multiply-accumulate) sequence path.
pub(crate) fn has_no_references(shape: &'static Shape) -> bool {
    reference_free(shape, &mut Vec::new())
}

fn reference_free(shape: &'static Shape, seen: &mut Vec<std::any::TypeId>) -> bool {
    // A type reached again on the same path recurses only through inline
    // storage (a zero-length self-array); nothing new to find there.
    match shape.kind() {
        ShapeKind::Scalar | ShapeKind::Pointer | ShapeKind::Opaque => true,
        ShapeKind::Composite(_) => {
            if seen.contains(&shape.id()) {
                return true;
            }
            seen.push(shape.id());
            fields::fields_of(shape)
                .iter()
                .all(|field| reference_free(field.shape, seen))
        }
        ShapeKind::Sequence(sequence) if sequence.buffer.is_none() => {
            if seen.contains(&shape.id()) {
                return true;
            }
            seen.push(shape.id());
            reference_free((sequence.element)(), seen)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Inspect;

    #[test]
    fn scalars_synthesize_to_leaf() {
        assert!(matches!(u64::shape().plan(), Plan::Leaf));
        assert!(matches!(<(u8, u16)>::shape().plan(), Plan::Leaf));
    }

    #[test]
    fn primitive_vec_is_packed() {
        match <Vec<u32>>::shape().plan() {
            Plan::PackedSeq { elem_size, .. } => assert_eq!(*elem_size, 4),
            _ => panic!("expected a packed sequence plan"),
        }
    }

    #[test]
    fn string_vec_needs_the_element_loop() {
        assert!(matches!(
            <Vec<String>>::shape().plan(),
            Plan::DeepSeq { .. }
        ));
    }

    #[test]
    fn boxed_scalar_bakes_the_pointee_body() {
        match <Box<u64>>::shape().plan() {
            Plan::Sealed { body, .. } => assert_eq!(*body, 8),
            _ => panic!("expected a sealed reference plan"),
        }
    }

    #[test]
    fn reference_freedom_is_recursive() {
        assert!(has_no_references(<(u8, (u16, u32))>::shape()));
        assert!(!has_no_references(String::shape()));
        assert!(!has_no_references(<(u8, Box<u8>)>::shape()));
    }

    #[test]
    fn reference_freedom_terminates_on_zero_length_self_arrays() {
        use crate::shape::{FieldDef, SequenceShape};

        // `struct Knot([Knot; 0])`, spelled out by hand: the only way a type
        // can contain itself inline.
        struct Knot;
        struct KnotSlots;

        fn knot_shape() -> &'static Shape {
            crate::shape::intern::<Knot>(|| {
                Shape::composite::<Knot>(
                    vec![FieldDef {
                        name: "0",
                        shape: slots_shape,
                        access: |_| None,
                    }],
                    None,
                )
            })
        }

        fn slots_shape() -> &'static Shape {
            crate::shape::intern::<KnotSlots>(|| {
                Shape::sequence::<KnotSlots>(SequenceShape {
                    element: knot_shape,
                    len: |_| 0,
                    each: |_, _| {},
                    buffer: None,
                    uniform: true,
                })
            })
        }

        assert!(has_no_references(knot_shape()));
    }

    #[test]
    fn plan_is_synthesized_once() {
        let first = <Vec<u8>>::shape().plan() as *const Plan;
        let second = <Vec<u8>>::shape().plan() as *const Plan;
        assert_eq!(first, second);
    }
}
