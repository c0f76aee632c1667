use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::ptr;

use crate::impls::inspect_methods;
use crate::shape::{self, Inspect, SequenceShape, Shape};

// Collection types. None of these expose their backing allocation directly,
// so the address of the first stored element stands in as the allocation's
// identity; an empty collection has no trackable identity and only its
// header is charged.
//
// Maps yield keys and values in turn, so `uniform` is off and the engine
// resolves each yielded value's own shape; the per-entry slot is the stride
// of the `(K, V)` pair.

fn hash_map_len<K: Inspect, V: Inspect>(value: &dyn Inspect) -> usize {
    value
        .as_any()
        .downcast_ref::<HashMap<K, V>>()
        .map_or(0, HashMap::len)
}

fn hash_map_buffer<K: Inspect, V: Inspect>(value: &dyn Inspect) -> *const () {
    value
        .as_any()
        .downcast_ref::<HashMap<K, V>>()
        .and_then(|map| map.keys().next())
        .map_or(ptr::null(), |key| key as *const K as *const ())
}

fn hash_map_each<'a, K: Inspect, V: Inspect>(
    value: &'a dyn Inspect,
    f: &mut dyn FnMut(&'a dyn Inspect),
) {
    if let Some(map) = value.as_any().downcast_ref::<HashMap<K, V>>() {
        for (key, val) in map {
            f(key);
            f(val);
        }
    }
}

impl<K: Inspect, V: Inspect> Inspect for HashMap<K, V> {
    fn shape() -> &'static Shape {
        shape::intern::<HashMap<K, V>>(|| {
            Shape::sequence::<HashMap<K, V>>(SequenceShape {
                element: <(K, V)>::shape,
                len: hash_map_len::<K, V>,
                each: hash_map_each::<K, V>,
                buffer: Some(hash_map_buffer::<K, V>),
                uniform: false,
            })
        })
    }

    inspect_methods!();
}

fn hash_set_len<T: Inspect>(value: &dyn Inspect) -> usize {
    value
        .as_any()
        .downcast_ref::<HashSet<T>>()
        .map_or(0, HashSet::len)
}

fn hash_set_buffer<T: Inspect>(value: &dyn Inspect) -> *const () {
    value
        .as_any()
        .downcast_ref::<HashSet<T>>()
        .and_then(|set| set.iter().next())
        .map_or(ptr::null(), |element| element as *const T as *const ())
}

fn hash_set_each<'a, T: Inspect>(value: &'a dyn Inspect, f: &mut dyn FnMut(&'a dyn Inspect)) {
    if let Some(set) = value.as_any().downcast_ref::<HashSet<T>>() {
        for element in set {
            f(element);
        }
    }
}

impl<T: Inspect> Inspect for HashSet<T> {
    fn shape() -> &'static Shape {
        shape::intern::<HashSet<T>>(|| {
            Shape::sequence::<HashSet<T>>(SequenceShape {
                element: T::shape,
                len: hash_set_len::<T>,
                each: hash_set_each::<T>,
                buffer: Some(hash_set_buffer::<T>),
                uniform: true,
            })
        })
    }

    inspect_methods!();
}

fn btree_map_len<K: Inspect, V: Inspect>(value: &dyn Inspect) -> usize {
    value
        .as_any()
        .downcast_ref::<BTreeMap<K, V>>()
        .map_or(0, BTreeMap::len)
}

fn btree_map_buffer<K: Inspect, V: Inspect>(value: &dyn Inspect) -> *const () {
    value
        .as_any()
        .downcast_ref::<BTreeMap<K, V>>()
        .and_then(|map| map.keys().next())
        .map_or(ptr::null(), |key| key as *const K as *const ())
}

fn btree_map_each<'a, K: Inspect, V: Inspect>(
    value: &'a dyn Inspect,
    f: &mut dyn FnMut(&'a dyn Inspect),
) {
    if let Some(map) = value.as_any().downcast_ref::<BTreeMap<K, V>>() {
        for (key, val) in map {
            f(key);
            f(val);
        }
    }
}

impl<K: Inspect, V: Inspect> Inspect for BTreeMap<K, V> {
    fn shape() -> &'static Shape {
        shape::intern::<BTreeMap<K, V>>(|| {
            Shape::sequence::<BTreeMap<K, V>>(SequenceShape {
                element: <(K, V)>::shape,
                len: btree_map_len::<K, V>,
                each: btree_map_each::<K, V>,
                buffer: Some(btree_map_buffer::<K, V>),
                uniform: false,
            })
        })
    }

    inspect_methods!();
}

fn btree_set_len<T: Inspect>(value: &dyn Inspect) -> usize {
    value
        .as_any()
        .downcast_ref::<BTreeSet<T>>()
        .map_or(0, BTreeSet::len)
}

fn btree_set_buffer<T: Inspect>(value: &dyn Inspect) -> *const () {
    value
        .as_any()
        .downcast_ref::<BTreeSet<T>>()
        .and_then(|set| set.iter().next())
        .map_or(ptr::null(), |element| element as *const T as *const ())
}

fn btree_set_each<'a, T: Inspect>(value: &'a dyn Inspect, f: &mut dyn FnMut(&'a dyn Inspect)) {
    if let Some(set) = value.as_any().downcast_ref::<BTreeSet<T>>() {
        for element in set {
            f(element);
        }
    }
}

impl<T: Inspect> Inspect for BTreeSet<T> {
    fn shape() -> &'static Shape {
        shape::intern::<BTreeSet<T>>(|| {
            Shape::sequence::<BTreeSet<T>>(SequenceShape {
                element: T::shape,
                len: btree_set_len::<T>,
                each: btree_set_each::<T>,
                buffer: Some(btree_set_buffer::<T>),
                uniform: true,
            })
        })
    }

    inspect_methods!();
}

fn deque_len<T: Inspect>(value: &dyn Inspect) -> usize {
    value
        .as_any()
        .downcast_ref::<VecDeque<T>>()
        .map_or(0, VecDeque::len)
}

fn deque_buffer<T: Inspect>(value: &dyn Inspect) -> *const () {
    value
        .as_any()
        .downcast_ref::<VecDeque<T>>()
        .and_then(|deque| deque.as_slices().0.first())
        .map_or(ptr::null(), |element| element as *const T as *const ())
}

fn deque_each<'a, T: Inspect>(value: &'a dyn Inspect, f: &mut dyn FnMut(&'a dyn Inspect)) {
    if let Some(deque) = value.as_any().downcast_ref::<VecDeque<T>>() {
        for element in deque {
            f(element);
        }
    }
}

impl<T: Inspect> Inspect for VecDeque<T> {
    fn shape() -> &'static Shape {
        shape::intern::<VecDeque<T>>(|| {
            Shape::sequence::<VecDeque<T>>(SequenceShape {
                element: T::shape,
                len: deque_len::<T>,
                each: deque_each::<T>,
                buffer: Some(deque_buffer::<T>),
                uniform: true,
            })
        })
    }

    inspect_methods!();
}

#[cfg(feature = "enable-indexmap")]
mod index {
    use std::ptr;

    use indexmap::{IndexMap, IndexSet};

    use crate::impls::inspect_methods;
    use crate::shape::{self, Inspect, SequenceShape, Shape};

    fn index_map_len<K: Inspect, V: Inspect>(value: &dyn Inspect) -> usize {
        value
            .as_any()
            .downcast_ref::<IndexMap<K, V>>()
            .map_or(0, IndexMap::len)
    }

    fn index_map_buffer<K: Inspect, V: Inspect>(value: &dyn Inspect) -> *const () {
        value
            .as_any()
            .downcast_ref::<IndexMap<K, V>>()
            .and_then(|map| map.get_index(0))
            .map_or(ptr::null(), |(key, _)| key as *const K as *const ())
    }

    fn index_map_each<'a, K: Inspect, V: Inspect>(
        value: &'a dyn Inspect,
        f: &mut dyn FnMut(&'a dyn Inspect),
    ) {
        if let Some(map) = value.as_any().downcast_ref::<IndexMap<K, V>>() {
            for (key, val) in map {
                f(key);
                f(val);
            }
        }
    }

    impl<K: Inspect, V: Inspect> Inspect for IndexMap<K, V> {
        fn shape() -> &'static Shape {
            shape::intern::<IndexMap<K, V>>(|| {
                Shape::sequence::<IndexMap<K, V>>(SequenceShape {
                    element: <(K, V)>::shape,
                    len: index_map_len::<K, V>,
                    each: index_map_each::<K, V>,
                    buffer: Some(index_map_buffer::<K, V>),
                    uniform: false,
                })
            })
        }

        inspect_methods!();
    }

    fn index_set_len<T: Inspect>(value: &dyn Inspect) -> usize {
        value
            .as_any()
            .downcast_ref::<IndexSet<T>>()
            .map_or(0, IndexSet::len)
    }

    fn index_set_buffer<T: Inspect>(value: &dyn Inspect) -> *const () {
        value
            .as_any()
            .downcast_ref::<IndexSet<T>>()
            .and_then(|set| set.get_index(0))
            .map_or(ptr::null(), |element| element as *const T as *const ())
    }

    fn index_set_each<'a, T: Inspect>(value: &'a dyn Inspect, f: &mut dyn FnMut(&'a dyn Inspect)) {
        if let Some(set) = value.as_any().downcast_ref::<IndexSet<T>>() {
            for element in set {
                f(element);
            }
        }
    }

    impl<T: Inspect> Inspect for IndexSet<T> {
        fn shape() -> &'static Shape {
            shape::intern::<IndexSet<T>>(|| {
                Shape::sequence::<IndexSet<T>>(SequenceShape {
                    element: T::shape,
                    len: index_set_len::<T>,
                    each: index_set_each::<T>,
                    buffer: Some(index_set_buffer::<T>),
                    uniform: true,
                })
            })
        }

        inspect_methods!();
    }
}
