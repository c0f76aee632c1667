//! Per-type storage-field enumeration.
//!
//! Write-rarely, read-often: the whole cache sits behind one shared lock and
//! each type's list is computed at most once, then handed out as a `'static`
//! slice to the synthesizer and the layout inspector.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;

use crate::shape::{FieldAccess, Shape, ShapeKind};

/// One storage field of a composite type, with its probed offset.
///
/// Offsets are relative to the first field of the instance and are matched to
/// declarations by index, since probe instances carry no meaningful values.
pub struct FieldDescriptor {
    pub name: &'static str,
    pub shape: &'static Shape,
    pub offset: Option<usize>,
    pub access: FieldAccess,
}

static FIELDS: Lazy<Mutex<HashMap<TypeId, &'static [FieldDescriptor]>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// The declared storage fields of `shape`, in declaration order. Empty for
/// non-composite shapes.
pub fn fields_of(shape: &'static Shape) -> &'static [FieldDescriptor] {
    let mut cache = FIELDS.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(descriptors) = cache.get(&shape.id()) {
        return *descriptors;
    }

    let descriptors: Vec<FieldDescriptor> = match shape.kind() {
        ShapeKind::Composite(composite) => {
            let offsets = composite.offsets.map(|probe| probe());

            composite
                .fields
                .iter()
                .enumerate()
                .map(|(index, field)| FieldDescriptor {
                    name: field.name,
                    shape: (field.shape)(),
                    offset: offsets
                        .as_ref()
                        .and_then(|offsets| offsets.get(index).copied()),
                    access: field.access,
                })
                .collect()
        }
        _ => Vec::new(),
    };

    let descriptors: &'static [FieldDescriptor] = Box::leak(descriptors.into_boxed_slice());
    cache.insert(shape.id(), descriptors);
    descriptors
}
