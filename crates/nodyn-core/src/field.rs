//! Field descriptors: kind, residency, and value type.

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::FieldError;

/// Role of a field within its node.
///
/// Input kinds receive values from at most one upstream field. Every other
/// kind can act as a connection source and fan out to many inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A plain tunable variable (e.g. a friction toggle).
    Var,
    /// A variable input, fed by an upstream `Var` or state.
    VarIn,
    /// A structured input (a topology, a boundary description).
    InstanceIn,
    /// A structured state owned by the node.
    InstanceState,
    /// A parallel-array input.
    ArrayIn,
    /// A parallel-array state owned by the node.
    ArrayState,
    /// A list-of-arrays state owned by the node.
    ArrayListState,
}

impl FieldKind {
    /// Whether this kind receives its value from an upstream connection.
    pub fn is_input(self) -> bool {
        matches!(self, Self::VarIn | Self::InstanceIn | Self::ArrayIn)
    }

    /// Whether this kind may be the source of a connection.
    pub fn is_source(self) -> bool {
        !self.is_input()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Var => "var",
            Self::VarIn => "var_in",
            Self::InstanceIn => "instance_in",
            Self::InstanceState => "instance_state",
            Self::ArrayIn => "array_in",
            Self::ArrayState => "array_state",
            Self::ArrayListState => "array_list_state",
        };
        f.write_str(s)
    }
}

/// Where a field's payload lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Residency {
    /// Host memory; accessed sequentially by the orchestrating thread.
    Host,
    /// Parallel-device memory; processed one task per element.
    Device,
}

/// Runtime identity of a field's stored Rust type.
///
/// Two value types are equal iff their `TypeId`s are equal; the name is
/// kept for error messages only.
#[derive(Clone, Copy, Debug)]
pub struct ValueType {
    id: TypeId,
    name: &'static str,
}

impl ValueType {
    /// Value type of `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Human-readable type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this is the value type of `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ValueType {}

impl Hash for ValueType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Declaration of a field: everything except its value.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    /// Name, unique within the owning node.
    pub name: String,
    /// Input/state/variable role.
    pub kind: FieldKind,
    /// Type of the stored value.
    pub value_type: ValueType,
    /// Host or device residency.
    pub residency: Residency,
    /// Free-form description for tooling.
    pub description: String,
}

impl FieldDescriptor {
    /// Create a descriptor for a value of type `T`.
    pub fn new<T: Any>(name: impl Into<String>, kind: FieldKind, residency: Residency) -> Self {
        Self {
            name: name.into(),
            kind,
            value_type: ValueType::of::<T>(),
            residency,
            description: String::new(),
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Check that `source` may feed `target`.
///
/// Fails with [`FieldError::InvalidDirection`] if `source` is an input or
/// `target` is not, and with [`FieldError::TypeMismatch`] if value type or
/// residency differ. There is no implicit coercion.
pub fn validate_connection(
    source: &FieldDescriptor,
    target: &FieldDescriptor,
) -> Result<(), FieldError> {
    if !source.kind.is_source() || !target.kind.is_input() {
        return Err(FieldError::InvalidDirection {
            source: source.name.clone(),
            source_kind: source.kind,
            target: target.name.clone(),
            target_kind: target.kind,
        });
    }
    if source.value_type != target.value_type || source.residency != target.residency {
        return Err(FieldError::TypeMismatch {
            field: target.name.clone(),
            expected: target.value_type.name(),
            found: source.value_type.name(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn desc<T: Any>(name: &str, kind: FieldKind) -> FieldDescriptor {
        FieldDescriptor::new::<T>(name, kind, Residency::Host)
    }

    #[test]
    fn input_kinds() {
        assert!(FieldKind::VarIn.is_input());
        assert!(FieldKind::InstanceIn.is_input());
        assert!(FieldKind::ArrayIn.is_input());
        assert!(!FieldKind::Var.is_input());
        assert!(FieldKind::ArrayState.is_source());
        assert!(FieldKind::ArrayListState.is_source());
    }

    #[test]
    fn value_type_equality_is_by_type() {
        assert_eq!(ValueType::of::<Vec<f32>>(), ValueType::of::<Vec<f32>>());
        assert_ne!(ValueType::of::<Vec<f32>>(), ValueType::of::<Vec<i32>>());
        assert!(ValueType::of::<u8>().is::<u8>());
    }

    #[test]
    fn matching_types_connect() {
        let src = desc::<f32>("out", FieldKind::Var);
        let dst = desc::<f32>("in", FieldKind::VarIn);
        assert!(validate_connection(&src, &dst).is_ok());
    }

    #[test]
    fn mismatched_types_rejected() {
        let src = desc::<Vec<f32>>("a", FieldKind::ArrayState);
        let dst = desc::<Vec<i32>>("b", FieldKind::ArrayIn);
        match validate_connection(&src, &dst) {
            Err(FieldError::TypeMismatch { field, .. }) => assert_eq!(field, "b"),
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn residency_is_part_of_identity() {
        let src = FieldDescriptor::new::<f32>("a", FieldKind::ArrayState, Residency::Host);
        let dst = FieldDescriptor::new::<f32>("b", FieldKind::ArrayIn, Residency::Device);
        assert!(matches!(
            validate_connection(&src, &dst),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn input_cannot_be_source() {
        let src = desc::<f32>("a", FieldKind::VarIn);
        let dst = desc::<f32>("b", FieldKind::VarIn);
        assert!(matches!(
            validate_connection(&src, &dst),
            Err(FieldError::InvalidDirection { .. })
        ));
    }

    #[test]
    fn state_cannot_be_target() {
        let src = desc::<f32>("a", FieldKind::Var);
        let dst = desc::<f32>("b", FieldKind::InstanceState);
        assert!(matches!(
            validate_connection(&src, &dst),
            Err(FieldError::InvalidDirection { .. })
        ));
    }

    fn arb_kind() -> impl Strategy<Value = FieldKind> {
        prop_oneof![
            Just(FieldKind::Var),
            Just(FieldKind::VarIn),
            Just(FieldKind::InstanceIn),
            Just(FieldKind::InstanceState),
            Just(FieldKind::ArrayIn),
            Just(FieldKind::ArrayState),
            Just(FieldKind::ArrayListState),
        ]
    }

    proptest! {
        #[test]
        fn connection_allowed_iff_direction_and_type_agree(
            src_kind in arb_kind(),
            dst_kind in arb_kind(),
            same_type in any::<bool>(),
        ) {
            let src = desc::<f32>("src", src_kind);
            let dst = if same_type {
                desc::<f32>("dst", dst_kind)
            } else {
                desc::<i32>("dst", dst_kind)
            };
            let ok = validate_connection(&src, &dst).is_ok();
            prop_assert_eq!(ok, src_kind.is_source() && dst_kind.is_input() && same_type);
        }
    }
}
