use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::{Lazy, OnceCell};

use crate::plan::Plan;

/// A value whose footprint can be measured.
///
/// Implementations describe the value's physical shape to the engine; they
/// never compute sizes themselves. Use `#[derive(Inspect)]` for your own
/// types.
pub trait Inspect: Any {
    /// The shape of this type, resolved statically.
    fn shape() -> &'static Shape
    where
        Self: Sized;

    /// The shape of this value's concrete runtime type.
    ///
    /// For a concrete `T` this is `T::shape()`; on a `dyn Inspect` it resolves
    /// the pointee's actual type, which is what makes polymorphic references
    /// sizable.
    fn shape_of(&self) -> &'static Shape;

    fn as_any(&self) -> &dyn Any;
}

/// Reads a field (or enum variant payload, or contained value) out of its
/// owner. `None` means the child is absent and contributes nothing.
pub type FieldAccess = for<'a> fn(&'a dyn Inspect) -> Option<&'a dyn Inspect>;

/// Resolves a heap indirection to its pointee and the pointee's identity.
pub type ReferentFn = for<'a> fn(&'a dyn Inspect) -> Option<Referent<'a>>;

/// Yields every element of a sequence to the callback.
pub type EachFn = for<'a> fn(&'a dyn Inspect, &mut dyn FnMut(&'a dyn Inspect));

/// Runs the callback against a guarded interior value (lock or cell) and
/// returns its result, or 0 when the interior is unreadable.
pub type WithFn = fn(&dyn Inspect, &mut dyn FnMut(&dyn Inspect) -> usize) -> usize;

pub type ShapeFn = fn() -> &'static Shape;
pub type TextFn = fn(&dyn Inspect) -> Option<TextBuf>;
pub type LenFn = fn(&dyn Inspect) -> usize;
pub type BufferFn = fn(&dyn Inspect) -> *const ();
pub type OffsetsFn = fn() -> Vec<usize>;

/// A resolved heap pointee. The address is the pointee's identity in the
/// visited-set, never dereferenced by the engine itself.
pub struct Referent<'a> {
    pub address: *const (),
    pub value: &'a dyn Inspect,
}

/// A text type's backing buffer.
pub struct TextBuf {
    pub address: *const (),
    pub len: usize,
}

/// One declared storage field of a composite shape.
pub struct FieldDef {
    pub name: &'static str,
    pub shape: ShapeFn,
    pub access: FieldAccess,
}

pub struct CompositeShape {
    pub fields: Vec<FieldDef>,
    /// Probes a zero-initialized instance for per-field offsets, matched to
    /// `fields` by index. `None` when the type cannot be probed (enums).
    pub offsets: Option<OffsetsFn>,
}

pub struct ReferenceShape {
    /// The pointee shape when it is statically known (sealed reference);
    /// `None` for `dyn` pointees, resolved per value via [`Inspect::shape_of`].
    pub target: Option<ShapeFn>,
    pub referent: ReferentFn,
}

/// `Option`-like and deferred-result containers: at most one inner value.
pub struct ProjectionShape {
    pub inner: ShapeFn,
    pub get: FieldAccess,
}

pub struct SequenceShape {
    pub element: ShapeFn,
    pub len: LenFn,
    pub each: EachFn,
    /// Identity of the backing allocation; `None` for inline arrays.
    pub buffer: Option<BufferFn>,
    /// Whether `each` yields values of exactly the `element` type. Maps yield
    /// keys and values in turn and set this to `false`.
    pub uniform: bool,
}

pub struct WrapperShape {
    pub with: WithFn,
}

/// The physical category of a type, fixed at shape construction.
pub enum ShapeKind {
    /// Inline data with no child references.
    Scalar,
    /// Pointer-width opaque value; never dereferenced.
    Pointer,
    /// Platform handle with no discoverable layout; sized conservatively.
    Opaque,
    /// Heap-buffered text.
    Text(TextFn),
    /// Inline struct, tuple, or enum with storage fields.
    Composite(CompositeShape),
    /// Heap indirection with its own identity (`Box`, `Rc`, `Arc`).
    Reference(ReferenceShape),
    /// `Option`: absent contributes 0; at top level, one pointer width.
    Nullable(ProjectionShape),
    /// Deferred-result container (`OnceCell`, `OnceLock`).
    Deferred(ProjectionShape),
    /// Element run, heap-backed (`Vec`) or inline (`[T; N]`).
    Sequence(SequenceShape),
    /// Guarded interior (`RefCell`, `Mutex`, `RwLock`, `Result`).
    Wrapper(WrapperShape),
}

/// Runtime description of one concrete type.
///
/// Shapes are `'static` and unique per type: non-generic types keep theirs in
/// a per-type static, generic instantiations are interned in a process-wide
/// registry. The sizing plan slot lives here, so resolving a plan for a
/// statically-known type touches no map at all.
pub struct Shape {
    name: &'static str,
    id: TypeId,
    kind: ShapeKind,
    stride: fn() -> usize,
    plan: OnceCell<Plan>,
}

impl Shape {
    fn new<T: 'static>(kind: ShapeKind) -> Shape {
        Shape {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
            kind,
            stride: crate::layout::stride_of::<T>,
            plan: OnceCell::new(),
        }
    }

    pub fn scalar<T: 'static>() -> Shape {
        Shape::new::<T>(ShapeKind::Scalar)
    }

    pub fn pointer<T: 'static>() -> Shape {
        Shape::new::<T>(ShapeKind::Pointer)
    }

    pub fn opaque<T: 'static>() -> Shape {
        Shape::new::<T>(ShapeKind::Opaque)
    }

    pub fn text<T: 'static>(buffer: TextFn) -> Shape {
        Shape::new::<T>(ShapeKind::Text(buffer))
    }

    pub fn composite<T: 'static>(fields: Vec<FieldDef>, offsets: Option<OffsetsFn>) -> Shape {
        Shape::new::<T>(ShapeKind::Composite(CompositeShape { fields, offsets }))
    }

    pub fn reference<T: 'static>(target: Option<ShapeFn>, referent: ReferentFn) -> Shape {
        Shape::new::<T>(ShapeKind::Reference(ReferenceShape { target, referent }))
    }

    pub fn nullable<T: 'static>(inner: ShapeFn, get: FieldAccess) -> Shape {
        Shape::new::<T>(ShapeKind::Nullable(ProjectionShape { inner, get }))
    }

    pub fn deferred<T: 'static>(inner: ShapeFn, get: FieldAccess) -> Shape {
        Shape::new::<T>(ShapeKind::Deferred(ProjectionShape { inner, get }))
    }

    pub fn sequence<T: 'static>(sequence: SequenceShape) -> Shape {
        Shape::new::<T>(ShapeKind::Sequence(sequence))
    }

    pub fn wrapper<T: 'static>(with: WithFn) -> Shape {
        Shape::new::<T>(ShapeKind::Wrapper(WrapperShape { with }))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Inline size of one instance, padding included.
    pub fn stride(&self) -> usize {
        (self.stride)()
    }

    /// The memoized sizing plan for this shape, synthesized on first use.
    pub(crate) fn plan(&'static self) -> &'static Plan {
        self.plan.get_or_init(|| crate::plan::synthesize(self))
    }
}

static REGISTRY: Lazy<RwLock<HashMap<TypeId, &'static Shape>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns the unique `'static` shape for `T`, building it on first use.
///
/// Concurrent first-time callers may both run `build`; only one result is
/// stored and handed out, the loser is discarded.
pub fn intern<T: 'static>(build: impl FnOnce() -> Shape) -> &'static Shape {
    let id = TypeId::of::<T>();

    {
        let shapes = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(shape) = shapes.get(&id) {
            return *shape;
        }
    }

    // Built outside the write lock: `build` may take arbitrarily long and
    // races are idempotent.
    let built: &'static Shape = Box::leak(Box::new(build()));

    let mut shapes = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    *shapes.entry(id).or_insert(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn racing_first_time_interning_stores_one_shape() {
        // All threads may build the shape, but every one of them must end up
        // holding the same stored copy and computing the same size.
        let handles: Vec<_> = (0..8)
            .map(|_| {
                thread::spawn(|| {
                    let value = vec![Arc::new(String::from("abc"))];
                    let address =
                        <Vec<Arc<String>> as Inspect>::shape() as *const Shape as usize;
                    (address, crate::size_of(&value))
                })
            })
            .collect();

        let results: Vec<(usize, usize)> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
