//! Field declarations and per-node field tables.
//!
//! A [`FieldDecl`] pairs a [`FieldDescriptor`] with the field's initial
//! value. Nodes register declarations into their [`FieldTable`] once, when
//! they are added to a graph. Values are type-erased but every access is
//! checked against the declared [`ValueType`](nodyn_core::ValueType).

use std::any::{type_name, Any};
use std::cell::{Cell, Ref, RefCell, RefMut};

use indexmap::IndexMap;
use nodyn_array::{DeviceArray, DeviceArrayList};
use nodyn_core::{FieldDescriptor, FieldError, FieldKind, FieldRef, NodeId, Residency, ValueType};
use smallvec::SmallVec;

type Payload = Box<dyn Any + Send>;

/// A field descriptor together with its initial value.
///
/// Constructed through the typed helpers so the stored value always
/// matches the descriptor's value type.
pub struct FieldDecl {
    descriptor: FieldDescriptor,
    initial: Payload,
}

impl FieldDecl {
    fn new<T: Any + Send>(name: &str, kind: FieldKind, residency: Residency, value: T) -> Self {
        Self {
            descriptor: FieldDescriptor::new::<T>(name, kind, residency),
            initial: Box::new(value),
        }
    }

    /// A plain variable with a default value.
    pub fn var<T: Any + Send>(name: &str, default: T) -> Self {
        Self::new(name, FieldKind::Var, Residency::Host, default)
    }

    /// A variable input; `default` is returned while unconnected.
    pub fn var_in<T: Any + Send>(name: &str, default: T) -> Self {
        Self::new(name, FieldKind::VarIn, Residency::Host, default)
    }

    /// A structured input, defaulting to `T::default()`.
    pub fn instance_in<T: Any + Send + Default>(name: &str) -> Self {
        Self::new(name, FieldKind::InstanceIn, Residency::Host, T::default())
    }

    /// A structured state owned by the node.
    pub fn instance_state<T: Any + Send>(name: &str, value: T) -> Self {
        Self::new(name, FieldKind::InstanceState, Residency::Host, value)
    }

    /// A device-array input (`DeviceArray<T>`), empty while unconnected.
    pub fn array_in<T: Any + Send>(name: &str) -> Self {
        Self::new(name, FieldKind::ArrayIn, Residency::Device, DeviceArray::<T>::new())
    }

    /// A device-array state (`DeviceArray<T>`), initially empty.
    pub fn array_state<T: Any + Send>(name: &str) -> Self {
        Self::new(name, FieldKind::ArrayState, Residency::Device, DeviceArray::<T>::new())
    }

    /// A host-resident array state (`Vec<T>`).
    pub fn host_array_state<T: Any + Send>(name: &str) -> Self {
        Self::new(name, FieldKind::ArrayState, Residency::Host, Vec::<T>::new())
    }

    /// A device list-of-arrays state (`DeviceArrayList<T>`).
    pub fn array_list_state<T: Any + Send>(name: &str) -> Self {
        Self::new(
            name,
            FieldKind::ArrayListState,
            Residency::Device,
            DeviceArrayList::<T>::new(),
        )
    }

    /// Attach a description.
    pub fn describe(mut self, description: &str) -> Self {
        self.descriptor.description = description.to_string();
        self
    }

    /// The declaration's descriptor.
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }
}

/// Storage for one declared field.
pub(crate) struct FieldSlot {
    pub(crate) descriptor: FieldDescriptor,
    value: RefCell<Payload>,
    pub(crate) source: Option<FieldRef>,
    pub(crate) sinks: SmallVec<[FieldRef; 4]>,
    version: Cell<u64>,
    seen: Cell<u64>,
}

/// Sentinel forcing the next `input_changed` check to report a change.
const UNSEEN: u64 = u64::MAX;

impl FieldSlot {
    fn new(decl: FieldDecl) -> Self {
        Self {
            descriptor: decl.descriptor,
            value: RefCell::new(decl.initial),
            source: None,
            sinks: SmallVec::new(),
            version: Cell::new(0),
            seen: Cell::new(UNSEEN),
        }
    }

    fn type_mismatch<T: Any>(&self) -> FieldError {
        FieldError::TypeMismatch {
            field: self.descriptor.name.clone(),
            expected: self.descriptor.value_type.name(),
            found: type_name::<T>(),
        }
    }

    fn check_type<T: Any>(&self) -> Result<(), FieldError> {
        if self.descriptor.value_type == ValueType::of::<T>() {
            Ok(())
        } else {
            Err(self.type_mismatch::<T>())
        }
    }

    pub(crate) fn borrow<T: Any>(&self) -> Result<Ref<'_, T>, FieldError> {
        self.check_type::<T>()?;
        let guard = self.value.try_borrow().map_err(|_| FieldError::BorrowConflict {
            name: self.descriptor.name.clone(),
        })?;
        Ref::filter_map(guard, |b| (**b).downcast_ref::<T>()).map_err(|_| self.type_mismatch::<T>())
    }

    /// Mutable access; counts as a write.
    pub(crate) fn borrow_mut<T: Any>(&self) -> Result<RefMut<'_, T>, FieldError> {
        self.check_type::<T>()?;
        let guard = self
            .value
            .try_borrow_mut()
            .map_err(|_| FieldError::BorrowConflict {
                name: self.descriptor.name.clone(),
            })?;
        self.version.set(self.version.get().wrapping_add(1) % UNSEEN);
        RefMut::filter_map(guard, |b| (**b).downcast_mut::<T>())
            .map_err(|_| self.type_mismatch::<T>())
    }

    pub(crate) fn version(&self) -> u64 {
        self.version.get()
    }

    /// Record that the owner observed `version`; returns whether it was new.
    pub(crate) fn observe(&self, version: u64) -> bool {
        let changed = self.seen.get() != version;
        self.seen.set(version);
        changed
    }

    pub(crate) fn forget_observation(&self) {
        self.seen.set(UNSEEN);
    }
}

/// The ordered set of fields declared by one node.
///
/// Names are unique; iteration follows declaration order, and the slot
/// index in a [`FieldRef`] is the declaration position.
pub struct FieldTable {
    node: NodeId,
    slots: IndexMap<String, FieldSlot>,
}

impl FieldTable {
    /// An empty table for `node`.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            slots: IndexMap::new(),
        }
    }

    /// Owning node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Register a field.
    ///
    /// Fails with [`FieldError::DuplicateFieldName`] if the name is taken;
    /// the table is unchanged in that case.
    pub fn declare(&mut self, decl: FieldDecl) -> Result<FieldRef, FieldError> {
        if self.slots.contains_key(&decl.descriptor.name) {
            return Err(FieldError::DuplicateFieldName {
                name: decl.descriptor.name,
            });
        }
        let slot = self.slots.len() as u32;
        self.slots
            .insert(decl.descriptor.name.clone(), FieldSlot::new(decl));
        Ok(FieldRef::new(self.node, slot))
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no fields are declared.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reference to the field called `name`.
    pub fn field_ref(&self, name: &str) -> Option<FieldRef> {
        self.slots
            .get_index_of(name)
            .map(|i| FieldRef::new(self.node, i as u32))
    }

    /// Descriptor of the field called `name`.
    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.slots.get(name).map(|s| &s.descriptor)
    }

    /// All descriptors in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.slots.values().map(|s| &s.descriptor)
    }

    pub(crate) fn slot(&self, name: &str) -> Result<&FieldSlot, FieldError> {
        self.slots.get(name).ok_or_else(|| FieldError::UnknownField {
            name: name.to_string(),
        })
    }

    pub(crate) fn slot_at(&self, index: u32) -> Result<&FieldSlot, FieldError> {
        self.slots
            .get_index(index as usize)
            .map(|(_, s)| s)
            .ok_or_else(|| FieldError::UnknownField {
                name: FieldRef::new(self.node, index).to_string(),
            })
    }

    pub(crate) fn slot_at_mut(&mut self, index: u32) -> Result<&mut FieldSlot, FieldError> {
        let node = self.node;
        self.slots
            .get_index_mut(index as usize)
            .map(|(_, s)| s)
            .ok_or_else(|| FieldError::UnknownField {
                name: FieldRef::new(node, index).to_string(),
            })
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = &FieldSlot> {
        self.slots.values()
    }

    /// Drop every stored value (including device arrays).
    pub(crate) fn release(&mut self) {
        self.slots.clear();
    }
}

/// Look up a slot by reference across all tables.
pub(crate) fn slot_of(tables: &[FieldTable], r: FieldRef) -> Result<&FieldSlot, FieldError> {
    tables
        .get(r.node.index())
        .ok_or_else(|| FieldError::UnknownField {
            name: r.to_string(),
        })?
        .slot_at(r.slot)
}

/// Follow an input's connection to the slot whose value it observes.
///
/// Unconnected fields resolve to themselves.
pub(crate) fn resolve<'a>(tables: &'a [FieldTable], slot: &'a FieldSlot) -> Result<&'a FieldSlot, FieldError> {
    match slot.source {
        Some(src) => slot_of(tables, src),
        None => Ok(slot),
    }
}
