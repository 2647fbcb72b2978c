// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Any-pointer squashing engine: classifier and rewriter over a typed
//! argument graph.
//!
//! A fuzzer mutating a call argument byte-for-byte has to respect the
//! type it's mutating: a struct field stays that field, an array stays
//! that length. Squashing breaks that constraint open for select
//! pointers by replacing what they point at with the `ANYPTRS` any-union
//! encoding, a flat, self-describing byte/resource stream that can be
//! mutated far more freely while still decoding back into something the
//! kernel will accept. [`classify`] decides which pointers are worth the
//! trade; [`squash`] performs the rewrite in place.
//!
//! The two phases run separately on purpose: [`classify::complex_ptrs`]
//! records *paths* into the program rather than holding mutable
//! references, so a caller can filter, log, or sample the candidate set
//! before committing to any rewrite, and so [`squash::squash_ptr`] never
//! has to reason about aliasing with the traversal that found its
//! target.

pub mod classify;
pub mod error;
pub mod squash;
pub mod traverse;

pub use classify::{
    arg_contains_any, call_contains_any, complex_ptrs, is_any_ptr, is_complex_ptr,
    ComplexPtrLocation, VARLEN_UNION_THRESHOLD,
};
pub use error::SquashError;
pub use squash::{squash_ptr, CSUM_PLACEHOLDER};
pub use traverse::{foreach_arg, foreach_sub_arg, resolve_mut, ArgPath, Step};

#[cfg(test)]
mod tests {
    use super::*;
    use squash_types::{
        Arg, ArgCommon, BinaryFormat, ConstArg, Dir, GroupArg, PointerArg, RegistryBuilder,
        ResultArg, Target, Type, TypeCommon, TypeKind,
    };

    fn test_registry() -> (squash_types::Registry, squash_types::TypeId) {
        let mut builder = RegistryBuilder::new();
        squash_types::push_any_family(&mut builder, 8);

        let int32 = builder.push(Type::new(
            TypeCommon::scalar(4, "int32", BinaryFormat::NativeEndian),
            TypeKind::Integer { pad: false },
        ));

        let registry = builder
            .finish(Target::new("amd64", "linux", 8))
            .expect("well-formed any-family");
        (registry, int32)
    }

    #[test]
    fn squashes_a_plain_integer_pointer() {
        let (registry, int32) = test_registry();
        let mut ptr = {
            let const_arg = Arg::Const(ConstArg::new(ArgCommon::new(int32, Dir::In, 4), 42));
            PointerArg::new(ArgCommon::new(registry.any().ptr64, Dir::In, 8), Some(const_arg), 0)
        };

        squash_ptr(&registry, &mut ptr).expect("squash succeeds");
        assert!(registry.is_any_ptr(ptr.common.ty));

        let group = match ptr.res.as_deref().unwrap() {
            Arg::Group(g) => g,
            other => panic!("expected GroupArg, got {other:?}"),
        };
        assert_eq!(group.inner.len(), 1);
        let union = match &group.inner[0] {
            Arg::Union(u) => u,
            other => panic!("expected UnionArg, got {other:?}"),
        };
        let data = match union.option.as_ref() {
            Arg::Data(d) => d,
            other => panic!("expected DataArg, got {other:?}"),
        };
        assert_eq!(data.data(), &42u32.to_le_bytes());
    }

    #[test]
    fn squash_result_never_folds_into_blob() {
        let (registry, int32) = test_registry();
        let result = Arg::Result(ResultArg::new(ArgCommon::new(int32, Dir::In, 4), Some(7)));
        let mut ptr = PointerArg::new(ArgCommon::new(registry.any().ptr64, Dir::In, 8), Some(result), 0);

        squash_ptr(&registry, &mut ptr).expect("squash succeeds");
        let group = match ptr.res.as_deref().unwrap() {
            Arg::Group(g) => g,
            other => panic!("expected GroupArg, got {other:?}"),
        };
        assert_eq!(group.inner.len(), 1);
        let union = match &group.inner[0] {
            Arg::Union(u) => u,
            other => panic!("expected UnionArg, got {other:?}"),
        };
        assert_eq!(union.index, 3); // res32
        assert!(matches!(union.option.as_ref(), Arg::Result(_)));
    }

    #[test]
    fn blob_coalescing_merges_adjacent_data_bytes() {
        let (registry, int32) = test_registry();
        let a = Arg::Const(ConstArg::new(ArgCommon::new(int32, Dir::In, 4), 1));
        let b = Arg::Const(ConstArg::new(ArgCommon::new(int32, Dir::In, 4), 2));
        let group_inner = vec![a, b];
        let group_ty = int32; // reuse int32's size semantics isn't used for Struct kind here
        let group = Arg::Group(GroupArg::new(ArgCommon::new(group_ty, Dir::In, 8), group_inner));
        let mut ptr = PointerArg::new(ArgCommon::new(registry.any().ptr64, Dir::In, 8), Some(group), 0);

        squash_ptr(&registry, &mut ptr).expect("squash succeeds");
        let outer = match ptr.res.as_deref().unwrap() {
            Arg::Group(g) => g,
            other => panic!("expected GroupArg, got {other:?}"),
        };
        assert_eq!(outer.inner.len(), 1, "two adjacent consts coalesce into one blob element");
    }

    #[test]
    fn fails_fast_on_non_pointer_precondition() {
        let (registry, _int32) = test_registry();
        let mut ptr = PointerArg::new(ArgCommon::new(registry.any().ptr64, Dir::In, 8), None, 0);
        assert!(matches!(squash_ptr(&registry, &mut ptr), Err(SquashError::SquashNonPointer)));
    }
}
