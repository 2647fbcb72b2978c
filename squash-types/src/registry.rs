//! The Type Registry: an immutable catalog of type descriptors for one target.

use crate::target::Target;
use crate::ty::{Type, TypeId, TypeKind};
use thiserror::Error;

/// Name the any-family union must carry, per the data model.
pub const ANYPTRS_NAME: &str = "ANYPTRS";

/// Names of the eight any-union alternatives, in their fixed order.
pub const ANY_UNION_FIELD_NAMES: [&str; 8] = [
    "blob", "res8", "res16", "res32", "res64", "resdec", "reshex", "resoct",
];

/// Failure to bootstrap the any-family from a [`Registry`].
///
/// Each variant corresponds to one schema violation a descriptor
/// compiler could in principle produce; this crate treats all of them
/// as fatal to registry construction, matching `initAnyTypes`'s panics
/// in the source material.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no builtin {ANYPTRS_NAME} type in registry")]
    MissingAnyPtrs,
    #[error("ANYPTRS has unexpected shape: {0}")]
    BadAnyPtrsShape(&'static str),
    #[error("bad any-pointer size {0}, expected target pointer size or 8")]
    BadAnyPtrSize(u64),
}

/// The any-family handles, captured once at [`Registry::finish`] time.
///
/// Mirrors `target.any` (`anyTypes`) from the source material: a
/// bundle of type-id handles resolved by walking `ANYPTRS`'s structure,
/// so that later lookups are identity comparisons against these ids
/// rather than repeated name lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyTypes {
    pub ptr_ptr: TypeId,
    pub ptr64: TypeId,
    pub array: TypeId,
    pub union: TypeId,
    pub blob: TypeId,
    pub res8: TypeId,
    pub res16: TypeId,
    pub res32: TypeId,
    pub res64: TypeId,
    pub resdec: TypeId,
    pub reshex: TypeId,
    pub resoct: TypeId,
}

/// The immutable catalog of type descriptors for one target.
///
/// Constructed via [`RegistryBuilder`]; read-only and freely `Send +
/// Sync` once built, as required by the concurrency model: many
/// programs for the same target may be squashed concurrently on
/// different threads against a single shared `Registry`.
#[derive(Debug)]
pub struct Registry {
    target: Target,
    types: Vec<Type>,
    any: AnyTypes,
}

impl Registry {
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }

    pub fn any(&self) -> &AnyTypes {
        &self.any
    }

    pub fn types(&self) -> &[Type] {
        &self.types
    }

    /// `getAnyPtrType` from the data model: the native any-pointer
    /// when `size == target.ptr_size`, the width-8 any-pointer when
    /// `size == 8`, else a schema-violation error. These are the only
    /// two widths a squashable pointer may have.
    pub fn get_any_ptr_type(&self, size: u64) -> Result<TypeId, RegistryError> {
        if size == self.target.ptr_size {
            Ok(self.any.ptr_ptr)
        } else if size == 8 {
            Ok(self.any.ptr64)
        } else {
            Err(RegistryError::BadAnyPtrSize(size))
        }
    }

    /// `isAnyPtr` from the data model: true iff `id` names a pointer
    /// whose element is the any-array, compared by identity against
    /// the handle captured at [`Registry::finish`] time.
    pub fn is_any_ptr(&self, id: TypeId) -> bool {
        match &self.get(id).kind {
            TypeKind::Ptr { elem, .. } => *elem == self.any.array,
            _ => false,
        }
    }
}

/// Builder for assembling a [`Registry`].
///
/// Stands in for the descriptor compiler, which in the source system
/// produces a finished type table that this core merely consumes.
/// Callers push leaf types first, then containers referencing them by
/// the `TypeId` returned from each push, building the arena
/// bottom-up.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    types: Vec<Type>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Push a type descriptor, returning the id other descriptors can
    /// reference it by.
    pub fn push(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len());
        self.types.push(ty);
        id
    }

    pub fn find_by_name(&self, name: &str) -> Option<TypeId> {
        self.types
            .iter()
            .position(|t| t.name() == name)
            .map(TypeId)
    }

    /// Perform the `initAnyTypes` walk and produce a finished
    /// [`Registry`].
    ///
    /// Locates the type named `ANYPTRS`, walks
    /// `fields[0] -> ptr -> array -> union -> 8 alternatives` and
    /// `fields[1] -> ptr`, and fails if any cast along the way
    /// disagrees with the shape mandated by the data model. This is a
    /// boundary between this crate and an external producer, so
    /// failures are returned rather than panicking.
    pub fn finish(self, target: Target) -> Result<Registry, RegistryError> {
        let types = self.types;
        let lookup = |name: &str| -> Option<TypeId> {
            types.iter().position(|t| t.name() == name).map(TypeId)
        };

        let any_ptrs_id = lookup(ANYPTRS_NAME).ok_or(RegistryError::MissingAnyPtrs)?;
        let any_ptrs = &types[any_ptrs_id.0];
        let any_ptrs_fields = any_ptrs
            .fields()
            .ok_or(RegistryError::BadAnyPtrsShape("ANYPTRS is not a union"))?;
        if any_ptrs_fields.len() != 2 {
            return Err(RegistryError::BadAnyPtrsShape(
                "ANYPTRS must have exactly two fields",
            ));
        }

        let ptr_ptr = any_ptrs_fields[0].ty;
        let ptr64 = any_ptrs_fields[1].ty;

        let (array_id, _, _) = types[ptr_ptr.0]
            .as_ptr()
            .ok_or(RegistryError::BadAnyPtrsShape("ANYPTRS.fields[0] not Ptr"))?;
        let (array64_id, _, ptr64_width) = types[ptr64.0]
            .as_ptr()
            .ok_or(RegistryError::BadAnyPtrsShape("ANYPTRS.fields[1] not Ptr"))?;
        if ptr64_width != 8 {
            return Err(RegistryError::BadAnyPtrsShape(
                "ANYPTRS.fields[1] must be a width-8 pointer",
            ));
        }

        let union_id = match &types[array_id.0].kind {
            TypeKind::Array { elem, .. } => *elem,
            _ => return Err(RegistryError::BadAnyPtrsShape("any-pointer element not Array")),
        };
        let union64_id = match &types[array64_id.0].kind {
            TypeKind::Array { elem, .. } => *elem,
            _ => {
                return Err(RegistryError::BadAnyPtrsShape(
                    "width-8 any-pointer element not Array",
                ))
            }
        };
        if union_id != union64_id {
            return Err(RegistryError::BadAnyPtrsShape(
                "the two any-pointer widths must share one element array/union",
            ));
        }

        let union_fields = types[union_id.0].fields().ok_or(RegistryError::BadAnyPtrsShape(
            "any-array element not Union",
        ))?;
        if union_fields.len() != 8 {
            return Err(RegistryError::BadAnyPtrsShape(
                "any-union must have exactly eight alternatives",
            ));
        }
        for (idx, expected_name) in ANY_UNION_FIELD_NAMES.iter().enumerate() {
            if union_fields[idx].name != *expected_name {
                return Err(RegistryError::BadAnyPtrsShape(
                    "any-union alternatives out of order",
                ));
            }
        }

        let blob = union_fields[0].ty;
        let res8 = union_fields[1].ty;
        let res16 = union_fields[2].ty;
        let res32 = union_fields[3].ty;
        let res64 = union_fields[4].ty;
        let resdec = union_fields[5].ty;
        let reshex = union_fields[6].ty;
        let resoct = union_fields[7].ty;

        if !matches!(types[blob.0].kind, TypeKind::Buffer) {
            return Err(RegistryError::BadAnyPtrsShape("blob alternative not Buffer"));
        }
        for id in [res8, res16, res32, res64, resdec, reshex, resoct] {
            if !matches!(types[id.0].kind, TypeKind::Resource) {
                return Err(RegistryError::BadAnyPtrsShape(
                    "resource alternative not Resource",
                ));
            }
        }

        let any = AnyTypes {
            ptr_ptr,
            ptr64,
            array: array_id,
            union: union_id,
            blob,
            res8,
            res16,
            res32,
            res64,
            resdec,
            reshex,
            resoct,
        };

        log::debug!(
            "registry bootstrapped for {}/{} (ptr_size={}): {} types",
            target.arch,
            target.os,
            target.ptr_size,
            types.len()
        );

        Ok(Registry { target, types, any })
    }
}
