//! Deciding which pointers are worth squashing.
//!
//! Grounded on `prog/any.go`'s `isAnyPtr`, `isComplexPtr`, `complexPtrs`,
//! `CallContainsAny`, and `ArgContainsAny`.

use crate::traverse::{foreach_arg, foreach_sub_arg, ArgPath};
use squash_types::{Arg, Call, PointerArg, Prog, Registry, TypeKind};

/// A variable-length union with more than this many alternatives makes
/// its enclosing pointer "complex" even without an explicit any-ptr.
/// The data model leaves the exact cutoff unspecified; `5` matches the
/// source material's constant.
pub const VARLEN_UNION_THRESHOLD: usize = 5;

/// `isAnyPtr`: true iff `ty` is a pointer to the any-array, identified
/// by comparing against the handles captured at registry bootstrap.
pub fn is_any_ptr(registry: &Registry, ty: squash_types::TypeId) -> bool {
    registry.is_any_ptr(ty)
}

/// `isComplexPtr`: whether replacing `arg`'s pointee with the any-union
/// encoding would plausibly let the fuzzer explore more states than
/// mutating it directly would.
///
/// True when the pointee is itself an any-pointer, or when the pointee
/// subtree contains a variable-length struct or a variable-length union
/// wider than [`VARLEN_UNION_THRESHOLD`]. Pointees whose element type
/// isn't marked `squashable_elem` are never complex, regardless of
/// content.
pub fn is_complex_ptr(registry: &Registry, arg: &PointerArg) -> bool {
    let Some(res) = arg.res.as_deref() else {
        return false;
    };
    let squashable_elem = match registry.get(arg.common.ty).as_ptr() {
        Some((_, squashable_elem, _)) => squashable_elem,
        None => false,
    };
    if !squashable_elem {
        return false;
    }
    if is_any_ptr(registry, arg.common.ty) {
        return true;
    }

    let mut complex = false;
    foreach_sub_arg(res, |a, _path, ctx| match &registry.get(a.ty()).kind {
        TypeKind::Struct { varlen: true, .. } => {
            complex = true;
            ctx.stop = true;
        }
        TypeKind::Union { varlen: true, fields, .. } if fields.len() > VARLEN_UNION_THRESHOLD => {
            complex = true;
            ctx.stop = true;
        }
        _ => {}
    });
    complex
}

/// Location of one complex pointer: which call, and the path down to it
/// from that call's top-level argument list.
#[derive(Debug, Clone)]
pub struct ComplexPtrLocation {
    pub call_index: usize,
    pub path: ArgPath,
}

/// `complexPtrs`: every complex pointer in `prog`, one shared traversal
/// per call. Since a call's traversal shares a single `ArgCtx`, setting
/// `stop` on the first hit ends that call's whole walk — at most one
/// location is recorded per call, matching the source material.
pub fn complex_ptrs(registry: &Registry, prog: &Prog) -> Vec<ComplexPtrLocation> {
    let mut out = Vec::new();
    for (call_index, call) in prog.calls.iter().enumerate() {
        foreach_arg(call, |arg, path, ctx| {
            if let Arg::Pointer(p) = arg {
                if is_complex_ptr(registry, p) {
                    out.push(ComplexPtrLocation {
                        call_index,
                        path: path.to_vec(),
                    });
                    ctx.stop = true;
                }
            }
        });
    }
    out
}

/// `CallContainsAny`: whether any argument of `call` is already an
/// any-pointer (i.e. the program was already squashed, or hand-written
/// to use `ANYPTRS` directly).
pub fn call_contains_any(registry: &Registry, call: &Call) -> bool {
    let mut found = false;
    foreach_arg(call, |arg, _path, ctx| {
        if is_any_ptr(registry, arg.ty()) {
            found = true;
            ctx.stop = true;
        }
    });
    found
}

/// `ArgContainsAny`: whether `arg` or anything beneath it is an
/// any-pointer.
pub fn arg_contains_any(registry: &Registry, arg: &Arg) -> bool {
    let mut found = false;
    foreach_sub_arg(arg, |a, _path, ctx| {
        if is_any_ptr(registry, a.ty()) {
            found = true;
            ctx.stop = true;
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use squash_types::{
        ArgCommon, BinaryFormat, Call, ConstArg, Dir, Field, PointerArg, RegistryBuilder, Target,
        Type, TypeCommon,
    };

    /// A registry with one extra pointer-to-variable-length-union type,
    /// the union carrying `varlen_union_len` alternatives, plus the
    /// ids needed to build a `PointerArg` pointing at it.
    fn registry_with(
        varlen_union_len: usize,
    ) -> (Registry, squash_types::TypeId, squash_types::TypeId, squash_types::TypeId) {
        let mut builder = RegistryBuilder::new();
        squash_types::push_any_family(&mut builder, 8);
        let int32 = builder.push(Type::new(
            TypeCommon::scalar(4, "int32", BinaryFormat::NativeEndian),
            TypeKind::Integer { pad: false },
        ));
        let fields: Vec<Field> = (0..varlen_union_len)
            .map(|i| Field::new(format!("alt{i}"), int32))
            .collect();
        let wide_union = builder.push(Type::new(
            TypeCommon::aggregate(4, "wide"),
            TypeKind::Union {
                fields,
                varlen: true,
                squashable_elem: true,
            },
        ));
        let ptr_ty = builder.push(Type::new(
            TypeCommon::scalar(8, "ptr[wide]", BinaryFormat::NativeEndian),
            TypeKind::Ptr {
                elem: wide_union,
                squashable_elem: true,
                ptr_width: 8,
            },
        ));
        let registry = builder.finish(Target::new("amd64", "linux", 8)).unwrap();
        (registry, int32, wide_union, ptr_ty)
    }

    #[test]
    fn small_varlen_union_is_not_complex() {
        let (registry, int32, union_ty, ptr_ty) = registry_with(VARLEN_UNION_THRESHOLD);
        let option = Arg::Const(ConstArg::new(ArgCommon::new(int32, Dir::In, 4), 1));
        let union_arg = squash_types::UnionArg::new(ArgCommon::new(union_ty, Dir::In, 4), option, 0);
        let ptr = PointerArg::new(
            ArgCommon::new(ptr_ty, Dir::In, 8),
            Some(Arg::Union(union_arg)),
            0,
        );
        assert!(!is_complex_ptr(&registry, &ptr));
    }

    #[test]
    fn varlen_union_past_threshold_is_complex() {
        let (registry, int32, union_ty, ptr_ty) = registry_with(VARLEN_UNION_THRESHOLD + 1);
        let option = Arg::Const(ConstArg::new(ArgCommon::new(int32, Dir::In, 4), 1));
        let union_arg = squash_types::UnionArg::new(ArgCommon::new(union_ty, Dir::In, 4), option, 0);
        let ptr = PointerArg::new(
            ArgCommon::new(ptr_ty, Dir::In, 8),
            Some(Arg::Union(union_arg)),
            0,
        );
        assert!(is_complex_ptr(&registry, &ptr));
    }

    #[test]
    fn already_any_ptr_is_trivially_complex() {
        let mut builder = RegistryBuilder::new();
        squash_types::push_any_family(&mut builder, 8);
        let registry = builder.finish(Target::new("amd64", "linux", 8)).unwrap();
        let blob = squash_types::DataArg::new(registry.any().blob, Dir::In, Vec::new());
        let elem = squash_types::UnionArg::wrapping(registry.any().union, Dir::In, Arg::Data(blob), 0);
        let group = squash_types::GroupArg::new(
            ArgCommon::new(registry.any().array, Dir::In, 0),
            vec![Arg::Union(elem)],
        );
        let ptr = PointerArg::new(
            ArgCommon::new(registry.any().ptr64, Dir::In, 8),
            Some(Arg::Group(group)),
            0,
        );
        assert!(is_complex_ptr(&registry, &ptr));
    }

    #[test]
    fn vma_reservation_without_pointee_is_never_complex() {
        let mut builder = RegistryBuilder::new();
        squash_types::push_any_family(&mut builder, 8);
        let registry = builder.finish(Target::new("amd64", "linux", 8)).unwrap();
        let ptr = PointerArg::new(ArgCommon::new(registry.any().ptr64, Dir::In, 8), None, 4096);
        assert!(!is_complex_ptr(&registry, &ptr));
    }

    #[test]
    fn call_contains_any_finds_nested_any_ptr() {
        let mut builder = RegistryBuilder::new();
        squash_types::push_any_family(&mut builder, 8);
        let registry = builder.finish(Target::new("amd64", "linux", 8)).unwrap();
        let blob = squash_types::DataArg::new(registry.any().blob, Dir::In, Vec::new());
        let elem = squash_types::UnionArg::wrapping(registry.any().union, Dir::In, Arg::Data(blob), 0);
        let group = squash_types::GroupArg::new(
            ArgCommon::new(registry.any().array, Dir::In, 0),
            vec![Arg::Union(elem)],
        );
        let ptr = PointerArg::new(
            ArgCommon::new(registry.any().ptr64, Dir::In, 8),
            Some(Arg::Group(group)),
            0,
        );
        let call = Call::new(0, vec![Arg::Pointer(ptr)]);
        assert!(call_contains_any(&registry, &call));

        let plain_call = Call::new(1, vec![]);
        assert!(!call_contains_any(&registry, &plain_call));
    }
}
