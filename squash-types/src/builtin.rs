//! Construction helper for the `ANYPTRS` any-family.
//!
//! Bootstrapping the any-family from scratch is the descriptor
//! compiler's job in the source system; this crate only consumes a
//! finished type table (see [`crate::RegistryBuilder::finish`]). This
//! module exists so that tests, the demo CLI, and any caller without
//! its own descriptor compiler integration can still produce a
//! well-formed `ANYPTRS` without hand-writing the eight-alternative
//! union every time.

use crate::registry::{RegistryBuilder, ANYPTRS_NAME, ANY_UNION_FIELD_NAMES};
use crate::ty::{ArrayLen, Field, Type, TypeCommon, TypeKind};
use crate::TypeId;

/// Push the any-family (blob, eight alternatives, array, the two
/// any-pointer widths, and `ANYPTRS` itself) into `builder`.
///
/// `ptr_size` is the target's native pointer width; the any-family
/// always has two pointer alternatives, one at `ptr_size` and one
/// fixed at 8 bytes, even when they coincide.
pub fn push_any_family(builder: &mut RegistryBuilder, ptr_size: u64) -> TypeId {
    let blob = builder.push(Type::new(
        TypeCommon::aggregate(0, "anyblob"),
        TypeKind::Buffer,
    ));

    // Native/big-endian resource widths.
    let res8 = builder.push(Type::new(
        TypeCommon::scalar(1, "res8", crate::BinaryFormat::NativeEndian),
        TypeKind::Resource,
    ));
    let res16 = builder.push(Type::new(
        TypeCommon::scalar(2, "res16", crate::BinaryFormat::NativeEndian),
        TypeKind::Resource,
    ));
    let res32 = builder.push(Type::new(
        TypeCommon::scalar(4, "res32", crate::BinaryFormat::NativeEndian),
        TypeKind::Resource,
    ));
    let res64 = builder.push(Type::new(
        TypeCommon::scalar(8, "res64", crate::BinaryFormat::NativeEndian),
        TypeKind::Resource,
    ));
    // Numeric-string resource widths: fixed widths per the const
    // encoding table (20/18/23 bytes for dec/hex/oct).
    let resdec = builder.push(Type::new(
        TypeCommon::scalar(20, "resdec", crate::BinaryFormat::StrDec),
        TypeKind::Resource,
    ));
    let reshex = builder.push(Type::new(
        TypeCommon::scalar(18, "reshex", crate::BinaryFormat::StrHex),
        TypeKind::Resource,
    ));
    let resoct = builder.push(Type::new(
        TypeCommon::scalar(23, "resoct", crate::BinaryFormat::StrOct),
        TypeKind::Resource,
    ));

    let alternatives = [blob, res8, res16, res32, res64, resdec, reshex, resoct];
    let union_fields: Vec<Field> = ANY_UNION_FIELD_NAMES
        .iter()
        .zip(alternatives.iter())
        .map(|(name, ty)| Field::new(*name, *ty))
        .collect();
    let union = builder.push(Type::new(
        TypeCommon::aggregate(0, "anyunion"),
        TypeKind::Union {
            fields: union_fields,
            varlen: true,
            squashable_elem: true,
        },
    ));

    let array = builder.push(Type::new(
        TypeCommon::aggregate(0, "anyarray"),
        TypeKind::Array {
            elem: union,
            len: ArrayLen::Range(0, u64::MAX),
        },
    ));

    let ptr_ptr = builder.push(Type::new(
        TypeCommon::scalar(ptr_size, "ptr64[anyarray]", crate::BinaryFormat::NativeEndian),
        TypeKind::Ptr {
            elem: array,
            squashable_elem: true,
            ptr_width: ptr_size,
        },
    ));
    let ptr64 = builder.push(Type::new(
        TypeCommon::scalar(8, "ptr64[anyarray, 8]", crate::BinaryFormat::NativeEndian),
        TypeKind::Ptr {
            elem: array,
            squashable_elem: true,
            ptr_width: 8,
        },
    ));

    builder.push(Type::new(
        TypeCommon::aggregate(ptr_size + 8, ANYPTRS_NAME),
        TypeKind::Union {
            fields: vec![Field::new("ptr", ptr_ptr), Field::new("ptr64", ptr64)],
            varlen: false,
            squashable_elem: false,
        },
    ))
}
