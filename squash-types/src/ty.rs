//! Type descriptors: the immutable catalog entries making up a [`crate::Registry`].

use crate::format::BinaryFormat;

/// Index of a [`Type`] inside its owning [`crate::Registry`] arena.
///
/// Inter-type edges (e.g. a pointer's element, a union's fields) are
/// stored as `TypeId`s rather than borrowed references, so that a
/// cyclic type graph (Ptr -> Array -> Union -> Ptr, as in the
/// `ANYPTRS` family) can live in a single `Vec` without self-referential
/// borrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

/// Fields every [`Type`] variant carries, per the data model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCommon {
    pub size: u64,
    pub name: String,
    pub format: BinaryFormat,
    pub bitfield_length: u64,
    pub bitfield_offset: u64,
    pub unit_size: u64,
}

impl TypeCommon {
    /// A non-bitfield descriptor with the given size/name/format and a
    /// unit size equal to its own size (the common case for scalars).
    pub fn scalar(size: u64, name: impl Into<String>, format: BinaryFormat) -> Self {
        Self {
            size,
            name: name.into(),
            format,
            bitfield_length: 0,
            bitfield_offset: 0,
            unit_size: size,
        }
    }

    /// A bitfield descriptor: a sub-range of a storage carrier of
    /// `unit_size` bytes, `length` bits wide at bit offset `offset`.
    pub fn bitfield(
        size: u64,
        name: impl Into<String>,
        length: u64,
        offset: u64,
        unit_size: u64,
    ) -> Self {
        Self {
            size,
            name: name.into(),
            format: BinaryFormat::NativeEndian,
            bitfield_length: length,
            bitfield_offset: offset,
            unit_size,
        }
    }

    /// A descriptor with no declared size yet (aggregate types compute
    /// their own size lazily via [`Type::size`]).
    pub fn aggregate(size: u64, name: impl Into<String>) -> Self {
        Self {
            size,
            name: name.into(),
            format: BinaryFormat::NativeEndian,
            bitfield_length: 0,
            bitfield_offset: 0,
            unit_size: 0,
        }
    }
}

/// A named field inside a [`TypeKind::Struct`] or [`TypeKind::Union`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Length policy for a [`TypeKind::Array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayLen {
    /// A fixed element count.
    Fixed(u64),
    /// A variable element count in `[min, max]`, inclusive.
    Range(u64, u64),
}

impl ArrayLen {
    /// Whether this length policy makes the array variable-length.
    pub fn is_varlen(&self) -> bool {
        match self {
            Self::Fixed(_) => false,
            Self::Range(min, max) => min != max,
        }
    }
}

/// Discriminant-specific data for a [`Type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// An integer value, or padding when `pad` is set. [`Type::is_pad`]
    /// is the `IsPad` predicate from the data model.
    Integer { pad: bool },
    /// A raw byte blob (the `blob` any-member is one of these).
    Buffer,
    /// An opaque resource handle: the id of a previously produced
    /// resource.
    Resource,
    /// A checksum field; its runtime value is computed elsewhere and
    /// the squasher emits a placeholder for it.
    Csum,
    /// Ordered field list.
    Struct {
        fields: Vec<Field>,
        /// Total size depends on content.
        varlen: bool,
        /// Tail fields share storage with earlier fields (overlay
        /// unions within a struct). Unsupported by the squasher.
        overlay_field: bool,
    },
    /// Unordered alternative list.
    Union {
        fields: Vec<Field>,
        varlen: bool,
        /// Propagates transitively to any pointer inside an
        /// alternative.
        squashable_elem: bool,
    },
    /// An element descriptor plus a length policy.
    Array { elem: TypeId, len: ArrayLen },
    /// A pointer to an element descriptor.
    Ptr {
        elem: TypeId,
        squashable_elem: bool,
        /// Byte width of the pointer itself (distinct from `elem`'s
        /// size).
        ptr_width: u64,
    },
}

/// A type descriptor: common layout fields plus variant-specific data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub common: TypeCommon,
    pub kind: TypeKind,
}

impl Type {
    pub fn new(common: TypeCommon, kind: TypeKind) -> Self {
        Self { common, kind }
    }

    pub fn size(&self) -> u64 {
        self.common.size
    }

    pub fn name(&self) -> &str {
        &self.common.name
    }

    pub fn format(&self) -> BinaryFormat {
        self.common.format
    }

    pub fn is_bitfield(&self) -> bool {
        self.common.bitfield_length != 0
    }

    pub fn bitfield_length(&self) -> u64 {
        self.common.bitfield_length
    }

    pub fn bitfield_offset(&self) -> u64 {
        self.common.bitfield_offset
    }

    pub fn unit_size(&self) -> u64 {
        self.common.unit_size
    }

    /// `IsPad` from the data model: true for pad-integer descriptors.
    pub fn is_pad(&self) -> bool {
        matches!(self.kind, TypeKind::Integer { pad: true })
    }

    /// True for a variable-length struct or union.
    pub fn varlen(&self) -> bool {
        match &self.kind {
            TypeKind::Struct { varlen, .. } => *varlen,
            TypeKind::Union { varlen, .. } => *varlen,
            TypeKind::Array { len, .. } => len.is_varlen(),
            _ => false,
        }
    }

    /// Fields of a struct or union, if applicable.
    pub fn fields(&self) -> Option<&[Field]> {
        match &self.kind {
            TypeKind::Struct { fields, .. } | TypeKind::Union { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn as_ptr(&self) -> Option<(TypeId, bool, u64)> {
        match &self.kind {
            TypeKind::Ptr {
                elem,
                squashable_elem,
                ptr_width,
            } => Some((*elem, *squashable_elem, *ptr_width)),
            _ => None,
        }
    }
}
