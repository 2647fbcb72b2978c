//! Argument graph: concrete-value tree for one call's arguments.

use crate::ty::TypeId;

/// Direction of an argument's data flow.
///
/// An `Out` [`DataArg`] contributes only padding on squash, since the
/// kernel (not the program) is expected to fill it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dir {
    In,
    Out,
    InOut,
}

/// Fields shared by every [`Arg`] variant: the capability set
/// `{Type(), Size(), Dir()}` from the data model.
///
/// `size` is a value cached on construction, not recomputed from the
/// type on every access: for non-variable-length types it must equal
/// `registry.get(ty).size()` (an invariant checked by callers/tests),
/// but for variable-length content it reflects the concrete value's
/// actual extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgCommon {
    pub ty: TypeId,
    pub dir: Dir,
    pub size: u64,
}

impl ArgCommon {
    pub fn new(ty: TypeId, dir: Dir, size: u64) -> Self {
        Self { ty, dir, size }
    }
}

/// An integer constant plus its type.
#[derive(Debug, Clone)]
pub struct ConstArg {
    pub common: ArgCommon,
    value: u64,
}

impl ConstArg {
    pub fn new(common: ArgCommon, value: u64) -> Self {
        Self { common, value }
    }

    /// `Value()`: the resolved value. Per the Non-goals, this is
    /// always a pure constant — no pid-dependent ("proc") resolution
    /// is performed here.
    pub fn value(&self) -> u64 {
        self.value
    }
}

/// A reference to a resource id produced elsewhere.
#[derive(Debug, Clone)]
pub struct ResultArg {
    pub common: ArgCommon,
    /// Id of the resource this argument refers to, if resolved.
    pub result_id: Option<u64>,
}

impl ResultArg {
    pub fn new(common: ArgCommon, result_id: Option<u64>) -> Self {
        Self { common, result_id }
    }
}

/// A mutable byte buffer.
#[derive(Debug, Clone)]
pub struct DataArg {
    pub common: ArgCommon,
    data: bytes::BytesMut,
}

impl DataArg {
    pub fn new(ty: TypeId, dir: Dir, data: impl AsRef<[u8]>) -> Self {
        let data = bytes::BytesMut::from(data.as_ref());
        let size = data.len() as u64;
        Self {
            common: ArgCommon::new(ty, dir, size),
            data,
        }
    }

    /// `Data()`: the buffer contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Append bytes, keeping `common.size` in sync with the new length.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
        self.common.size = self.data.len() as u64;
    }

    /// Append `n` zero bytes, keeping `common.size` in sync.
    pub fn append_zeros(&mut self, n: u64) {
        self.data.resize(self.data.len() + n as usize, 0);
        self.common.size = self.data.len() as u64;
    }
}

/// An ordered child list: a Struct or Array instance.
#[derive(Debug, Clone)]
pub struct GroupArg {
    pub common: ArgCommon,
    pub inner: Vec<Arg>,
}

impl GroupArg {
    pub fn new(common: ArgCommon, inner: Vec<Arg>) -> Self {
        Self { common, inner }
    }
}

/// A single chosen alternative plus its index inside the union's
/// field list.
#[derive(Debug, Clone)]
pub struct UnionArg {
    pub common: ArgCommon,
    pub option: Box<Arg>,
    pub index: usize,
}

impl UnionArg {
    pub fn new(common: ArgCommon, option: Arg, index: usize) -> Self {
        Self {
            common,
            option: Box::new(option),
            index,
        }
    }

    /// Construct a union argument wrapping `option` at `index`, sizing
    /// it to the option's own size. Used for the any-family's
    /// inherently variable-length union, where there is no fixed
    /// declared size to fall back on.
    pub fn wrapping(ty: TypeId, dir: Dir, option: Arg, index: usize) -> Self {
        let size = option.size();
        Self::new(ArgCommon::new(ty, dir, size), option, index)
    }
}

/// Either a pointee (`res`) or a reserved-but-unpopulated VMA
/// (`vma_size`), never both.
#[derive(Debug, Clone)]
pub struct PointerArg {
    pub common: ArgCommon,
    pub res: Option<Box<Arg>>,
    pub vma_size: u64,
}

impl PointerArg {
    pub fn new(common: ArgCommon, res: Option<Arg>, vma_size: u64) -> Self {
        Self {
            common,
            res: res.map(Box::new),
            vma_size,
        }
    }
}

/// A node in the argument graph.
#[derive(Debug, Clone)]
pub enum Arg {
    Const(ConstArg),
    Result(ResultArg),
    Data(DataArg),
    Group(GroupArg),
    Union(UnionArg),
    Pointer(PointerArg),
}

impl Arg {
    pub fn common(&self) -> &ArgCommon {
        match self {
            Arg::Const(a) => &a.common,
            Arg::Result(a) => &a.common,
            Arg::Data(a) => &a.common,
            Arg::Group(a) => &a.common,
            Arg::Union(a) => &a.common,
            Arg::Pointer(a) => &a.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ArgCommon {
        match self {
            Arg::Const(a) => &mut a.common,
            Arg::Result(a) => &mut a.common,
            Arg::Data(a) => &mut a.common,
            Arg::Group(a) => &mut a.common,
            Arg::Union(a) => &mut a.common,
            Arg::Pointer(a) => &mut a.common,
        }
    }

    pub fn ty(&self) -> TypeId {
        self.common().ty
    }

    pub fn dir(&self) -> Dir {
        self.common().dir
    }

    pub fn size(&self) -> u64 {
        self.common().size
    }
}

/// Context threaded through the `foreach_arg`/`foreach_sub_arg`
/// traversal callbacks (`squash-core::traverse`).
///
/// Setting `stop` cancels further descent into the current subtree and
/// terminates sibling iteration for that level, mirroring `ArgCtx.Stop`
/// in the source material.
#[derive(Debug, Default)]
pub struct ArgCtx {
    pub stop: bool,
}
