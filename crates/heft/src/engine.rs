//! The traversal engine.
//!
//! A [`Profiler`] owns nothing but its mode; every top-level query opens a
//! fresh [`Session`] holding the visited-set, the optional detail-tree
//! builder and a one-slot `(shape, plan)` memo, and tears it down on return.
//! Plans call back in here for every nested reference, so deduplication and
//! cycle policy are enforced in one place no matter which plan is running.

use std::collections::HashSet;
use std::ptr;

use crate::detail::{DetailBuilder, SizeNode};
use crate::layout::{self, ALLOCATION_OVERHEAD};
use crate::plan::{ChildSlot, Plan};
use crate::shape::{Inspect, Shape};

/// Traversal semantics, fixed when the profiler is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No visited-set: every reference is sized each time it is reached.
    /// Shared objects are counted per path; cyclic inputs do not terminate.
    Tree,
    /// Visited-set active: each object is counted once per query, which both
    /// deduplicates shared sub-objects and terminates cycles.
    Graph,
    /// Graph semantics plus a per-object size tree from
    /// [`Profiler::detailed_size_of`].
    Detailed,
}

/// `detailed_size_of` was called on an engine not built in detailed mode.
#[derive(Debug, thiserror::Error)]
#[error("detailed size queries require Mode::Detailed, this engine was built with Mode::{0:?}")]
pub struct ModeError(pub Mode);

/// Computes the retained footprint of values, in bytes.
pub struct Profiler {
    mode: Mode,
}

impl Profiler {
    pub fn new(mode: Mode) -> Profiler {
        Profiler { mode }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Footprint of `value` in bytes: its inline size plus, per mode, the
    /// heap data reachable from it.
    pub fn size_of<T: Inspect>(&self, value: &T) -> usize {
        let mut session = Session::new(self.mode, false, ptr::null());
        session.measure_root(T::shape(), value)
    }

    /// Same traversal as [`Profiler::size_of`], additionally reconstructing
    /// the object graph as a tree of per-object sizes.
    pub fn detailed_size_of<T: Inspect>(&self, value: &T) -> Result<SizeNode, ModeError> {
        if self.mode != Mode::Detailed {
            return Err(ModeError(self.mode));
        }

        let root = value as *const T as *const ();
        let mut session = Session::new(self.mode, true, root);
        let total = session.measure_root(T::shape(), value);

        match session.detail.take() {
            Some(builder) => Ok(builder.finish(total)),
            None => Err(ModeError(self.mode)),
        }
    }
}

/// State owned by a single top-level query.
struct Session {
    visited: Option<HashSet<*const ()>>,
    detail: Option<DetailBuilder>,
    last: Option<(&'static Shape, &'static Plan)>,
}

impl Session {
    fn new(mode: Mode, detailed: bool, root: *const ()) -> Session {
        Session {
            visited: match mode {
                Mode::Tree => None,
                Mode::Graph | Mode::Detailed => Some(HashSet::new()),
            },
            detail: detailed.then(|| DetailBuilder::new(root)),
            last: None,
        }
    }

    fn measure_root(&mut self, shape: &'static Shape, value: &dyn Inspect) -> usize {
        shape.stride() + self.contribution(value, shape)
    }

    /// First encounter of `address` in this query?
    fn track(&mut self, address: *const ()) -> bool {
        match &mut self.visited {
            Some(visited) => visited.insert(address),
            None => true,
        }
    }

    /// Plan resolution with the one-slot memo: consecutive same-typed
    /// siblings (homogeneous collections) skip straight to the last plan.
    fn plan_for(&mut self, shape: &'static Shape) -> &'static Plan {
        if let Some((last_shape, last_plan)) = self.last {
            if ptr::eq(last_shape, shape) {
                return last_plan;
            }
        }

        let plan = shape.plan();
        self.last = Some((shape, plan));
        plan
    }

    /// Heap contribution of `value`: bytes owned beyond its inline stride.
    fn contribution(&mut self, value: &dyn Inspect, shape: &'static Shape) -> usize {
        let plan = self.plan_for(shape);
        self.run(plan, value)
    }

    fn run(&mut self, plan: &'static Plan, value: &dyn Inspect) -> usize {
        match plan {
            Plan::Leaf => 0,

            Plan::Text { buffer } => match buffer(value) {
                None => 0,
                Some(buf) => {
                    if buf.len != 0 && !self.track(buf.address) {
                        return 0;
                    }
                    let total = ALLOCATION_OVERHEAD + buf.len;
                    self.enter(buf.address);
                    self.exit(total);
                    total
                }
            },

            Plan::Composite { children } => {
                let mut sum = 0;
                'slots: for slot in children.iter() {
                    let ChildSlot { path, shape } = slot;
                    let mut child: &dyn Inspect = value;
                    for access in path.iter() {
                        match access(child) {
                            Some(next) => child = next,
                            None => continue 'slots,
                        }
                    }
                    sum += self.contribution(child, *shape);
                }
                sum
            }

            Plan::Sealed {
                referent,
                pointee,
                body,
            } => match referent(value) {
                None => 0,
                Some(r) => {
                    if !self.track(r.address) {
                        return 0;
                    }
                    self.enter(r.address);
                    let total = ALLOCATION_OVERHEAD + body + self.contribution(r.value, *pointee);
                    self.exit(total);
                    total
                }
            },

            Plan::Virtual { referent } => match referent(value) {
                None => 0,
                Some(r) => {
                    if !self.track(r.address) {
                        return 0;
                    }
                    let concrete = r.value.shape_of();
                    self.enter(r.address);
                    let total = ALLOCATION_OVERHEAD
                        + layout::body_of(concrete)
                        + self.contribution(r.value, concrete);
                    self.exit(total);
                    total
                }
            },

            Plan::PackedSeq {
                len,
                buffer,
                elem_size,
            } => {
                let n = len(value);
                let address = buffer(value);
                if n != 0 && !self.track(address) {
                    return 0;
                }
                // One multiply-accumulate; the elements hold no references.
                let total = ALLOCATION_OVERHEAD + n * elem_size;
                self.enter(address);
                self.exit(total);
                total
            }

            Plan::DeepSeq {
                len,
                each,
                buffer,
                slot,
                elem,
            } => {
                let n = len(value);
                let address = buffer(value);
                if n != 0 && !self.track(address) {
                    return 0;
                }
                self.enter(address);
                let mut total = ALLOCATION_OVERHEAD + n * slot;
                each(value, &mut |element| {
                    let shape = match elem {
                        Some(shape) => *shape,
                        None => element.shape_of(),
                    };
                    total += self.contribution(element, shape);
                });
                self.exit(total);
                total
            }

            Plan::InlineSeq { each, elem } => {
                let mut total = 0;
                each(value, &mut |element| {
                    let shape = match elem {
                        Some(shape) => *shape,
                        None => element.shape_of(),
                    };
                    total += self.contribution(element, shape);
                });
                total
            }

            Plan::Optional { get, inner } => match get(value) {
                Some(present) => self.contribution(present, *inner),
                None => 0,
            },

            Plan::Deferred { get, inner } => match get(value) {
                Some(result) => self.contribution(result, *inner),
                None => 0,
            },

            Plan::Wrapper { with } => {
                let mut contribution =
                    |interior: &dyn Inspect| self.contribution(interior, interior.shape_of());
                with(value, &mut contribution)
            }
        }
    }

    fn enter(&mut self, address: *const ()) {
        if let Some(detail) = &mut self.detail {
            detail.enter(address);
        }
    }

    fn exit(&mut self, total: usize) {
        if let Some(detail) = &mut self.detail {
            detail.exit(total);
        }
    }
}
