//! Rewriting a complex pointer's pointee into the `ANYPTRS` encoding.
//!
//! Grounded on `prog/any.go`'s `squashPtr`, `squashPtrImpl` (here
//! `squash_impl`), `squashConst`, `squashResult`, `squashGroup`,
//! `squashedValue`, and `ensureDataElem`. `squash_ptr` clones the
//! pointee and works on the clone so a fatal error partway through
//! never leaves the original `PointerArg` without a `Res` or with a
//! size-mismatched one committed in its place; the clone is itself
//! consumed by value through the recursive descent, so there is no
//! aliasing concern in walking it while rewriting `ResultArg` types in
//! place — the old nodes are either discarded or relocated wholesale
//! into the new flattened element list.

use crate::error::SquashError;
use squash_types::{
    Arg, ArgCommon, BinaryFormat, ConstArg, Dir, GroupArg, PointerArg, Registry, ResultArg, Type,
    TypeKind, UnionArg,
};

/// The placeholder emitted in place of a checksum field's real value.
///
/// Checksums are computed over the final encoded program, which no
/// longer exists in the same shape once squashed; the source material
/// papers over this with a fixed stand-in rather than attempting to
/// recompute anything.
pub const CSUM_PLACEHOLDER: u64 = 0xabcd_ef12_3456_7890;

/// `squashPtr`: replace `ptr`'s pointee with the flattened `ANYPTRS`
/// encoding, preserving its total byte size.
///
/// Fails if `ptr` has no pointee, or reserves a VMA instead of pointing
/// at data (`vma_size != 0`) — callers are expected to have filtered to
/// [`crate::classify::complex_ptrs`] locations first, which only ever
/// point at populated, non-VMA pointers.
pub fn squash_ptr(registry: &Registry, ptr: &mut PointerArg) -> Result<(), SquashError> {
    if ptr.vma_size != 0 || ptr.res.is_none() {
        return Err(SquashError::SquashNonPointer);
    }

    // Work on a clone of the pointee so every fallible step below can
    // use `?` freely: on any `Err` return, `ptr` has not been touched
    // yet and is still exactly what it was on entry. Only once the new
    // element list and its type are fully built and size-checked do we
    // commit them into `ptr`.
    let pointee = (**ptr.res.as_ref().unwrap()).clone();
    let before = pointee.size();

    let mut elems = Vec::new();
    squash_impl(registry, pointee, &mut elems)?;
    for elem in elems.iter_mut() {
        if let Arg::Union(u) = elem {
            u.common.size = u.option.size();
        }
    }
    let after: u64 = elems.iter().map(|e| e.size()).sum();

    let new_ty = registry.get_any_ptr_type(registry.get(ptr.common.ty).size())?;
    let (array_ty, _, _) = registry
        .get(new_ty)
        .as_ptr()
        .expect("any-pointer type is always Ptr");

    if after != before {
        return Err(SquashError::SizeMismatch { before, after });
    }

    ptr.common.ty = new_ty;
    ptr.res = Some(Box::new(Arg::Group(GroupArg::new(
        ArgCommon::new(array_ty, Dir::In, after),
        elems,
    ))));
    Ok(())
}

/// `squashPtrImpl`: flatten one argument (and everything beneath it)
/// into `elems`, the any-union alternative list being assembled.
fn squash_impl(registry: &Registry, arg: Arg, elems: &mut Vec<Arg>) -> Result<(), SquashError> {
    if registry.get(arg.ty()).is_bitfield() {
        return Err(SquashError::BitfieldAtTopLevel);
    }

    let mut pad: u64 = 0;
    match arg {
        Arg::Const(c) => squash_const(registry, c, elems)?,
        Arg::Result(r) => squash_result(registry, r, elems)?,
        Arg::Data(d) => match d.common.dir {
            Dir::Out => pad = d.common.size,
            _ => ensure_data_elem(registry, elems).append(d.data()),
        },
        Arg::Union(u) => {
            let declared = u.common.size;
            if !registry.get(u.common.ty).varlen() {
                pad = declared.saturating_sub(u.option.size());
            }
            squash_impl(registry, *u.option, elems)?;
        }
        Arg::Group(g) => squash_group(registry, g, elems)?,
        Arg::Pointer(_) => return Err(SquashError::NestedPointerUnsupported),
    }

    if pad != 0 {
        ensure_data_elem(registry, elems).append_zeros(pad);
    }
    Ok(())
}

/// `squashConst`: encode a constant's value per its type's binary
/// format, appending to the trailing blob.
fn squash_const(registry: &Registry, arg: ConstArg, elems: &mut Vec<Arg>) -> Result<(), SquashError> {
    let ty = registry.get(arg.common.ty);
    if ty.is_pad() {
        ensure_data_elem(registry, elems).append_zeros(arg.common.size);
        return Ok(());
    }

    let (value, format) = squashed_value(ty, &arg)?;
    let encoded = encode_const(format, value, arg.common.size)?;
    ensure_data_elem(registry, elems).append(&encoded);
    Ok(())
}

fn encode_const(format: BinaryFormat, value: u64, size: u64) -> Result<Vec<u8>, SquashError> {
    let encoded = match format {
        BinaryFormat::NativeEndian => {
            let mut v = value;
            let mut bytes = Vec::with_capacity(size as usize);
            for _ in 0..size {
                bytes.push((v & 0xff) as u8);
                v >>= 8;
            }
            bytes
        }
        BinaryFormat::StrDec => format!("{value:020}").into_bytes(),
        BinaryFormat::StrHex => format!("0x{value:016x}").into_bytes(),
        BinaryFormat::StrOct => format!("{value:023o}").into_bytes(),
        BinaryFormat::BigEndian => unreachable!("squashed_value never returns BigEndian"),
    };
    if encoded.len() as u64 != size {
        return Err(SquashError::ConstEncodingSizeMismatch {
            expected: size,
            actual: encoded.len(),
        });
    }
    Ok(encoded)
}

/// `squashedValue`: resolve a constant's effective value and format,
/// folding `Csum` into the fixed placeholder and big-endian values into
/// a byte-swapped native encoding.
fn squashed_value(ty: &Type, arg: &ConstArg) -> Result<(u64, BinaryFormat), SquashError> {
    if matches!(ty.kind, TypeKind::Csum) {
        return Ok((CSUM_PLACEHOLDER, BinaryFormat::NativeEndian));
    }

    let mut value = arg.value();
    let mut format = ty.format();
    if format == BinaryFormat::BigEndian {
        value = match ty.unit_size() {
            2 => (value as u16).swap_bytes() as u64,
            4 => (value as u32).swap_bytes() as u64,
            8 => value.swap_bytes(),
            other => return Err(SquashError::BadConstUnitSize(other)),
        };
        format = BinaryFormat::NativeEndian;
    }
    Ok((value, format))
}

/// `squashResult`: retarget a resource reference onto one of the
/// any-family's seven resource descriptors (never a blob) and relocate
/// it wholesale into `elems`, wrapped in the any-union at the matching
/// index.
fn squash_result(registry: &Registry, mut arg: ResultArg, elems: &mut Vec<Arg>) -> Result<(), SquashError> {
    let ty = registry.get(arg.common.ty);
    let (target_ty, index) = match (ty.format(), arg.common.size) {
        (BinaryFormat::NativeEndian | BinaryFormat::BigEndian, 1) => (registry.any().res8, 1),
        (BinaryFormat::NativeEndian | BinaryFormat::BigEndian, 2) => (registry.any().res16, 2),
        (BinaryFormat::NativeEndian | BinaryFormat::BigEndian, 4) => (registry.any().res32, 3),
        (BinaryFormat::NativeEndian | BinaryFormat::BigEndian, 8) => (registry.any().res64, 4),
        (BinaryFormat::NativeEndian | BinaryFormat::BigEndian, sz) => {
            return Err(SquashError::UnsupportedResultSize(sz))
        }
        (BinaryFormat::StrDec, _) => (registry.any().resdec, 5),
        (BinaryFormat::StrHex, _) => (registry.any().reshex, 6),
        (BinaryFormat::StrOct, _) => (registry.any().resoct, 7),
    };

    arg.common.ty = target_ty;
    arg.common.size = registry.get(target_ty).size();
    let wrapped = UnionArg::wrapping(registry.any().union, Dir::In, Arg::Result(arg), index);
    elems.push(Arg::Union(wrapped));
    Ok(())
}

/// `squashGroup`: flatten a struct/array instance field by field,
/// coalescing consecutive bitfields into their shared storage carrier
/// and padding out any slack between the declared size and the sum of
/// emitted fields.
fn squash_group(registry: &Registry, arg: GroupArg, elems: &mut Vec<Arg>) -> Result<(), SquashError> {
    if let TypeKind::Struct { overlay_field: true, .. } = &registry.get(arg.common.ty).kind {
        return Err(SquashError::OverlayStruct);
    }

    let mut bitfield: u64 = 0;
    let mut fields_size: u64 = 0;

    for field in arg.inner {
        let field_size = field.size();
        fields_size += field_size;
        let field_ty = registry.get(field.ty());

        if field_ty.is_bitfield() {
            let const_arg = match field {
                Arg::Const(c) => c,
                _ => return Err(SquashError::BitfieldResultUnsupported),
            };
            let (value, format) = squashed_value(field_ty, &const_arg)?;
            if format != BinaryFormat::NativeEndian {
                return Err(SquashError::BitfieldBadFormat);
            }
            let mask = (1u64 << field_ty.bitfield_length()) - 1;
            bitfield |= (value & mask) << field_ty.bitfield_offset();

            if field_size != 0 {
                let carrier = encode_const(BinaryFormat::NativeEndian, bitfield, field_size)?;
                ensure_data_elem(registry, elems).append(&carrier);
                bitfield = 0;
            }
            continue;
        }

        squash_impl(registry, field, elems)?;
    }

    let pad = arg.common.size.saturating_sub(fields_size);
    if pad != 0 {
        ensure_data_elem(registry, elems).append_zeros(pad);
    }
    Ok(())
}

/// `ensureDataElem`: the trailing element of `elems` if it already
/// wraps a blob, else a freshly pushed empty one. Adjacent raw-byte
/// emissions (padding, encoded constants, coalesced bitfields) land in
/// one `DataArg` this way instead of one `UnionArg` apiece; a
/// `ResultArg` always breaks the run, since it is never folded into a
/// blob.
fn ensure_data_elem<'a>(
    registry: &Registry,
    elems: &'a mut Vec<Arg>,
) -> &'a mut squash_types::DataArg {
    let needs_new = !matches!(elems.last(), Some(Arg::Union(u)) if matches!(*u.option, Arg::Data(_)));
    if needs_new {
        let blob = squash_types::DataArg::new(registry.any().blob, Dir::In, Vec::new());
        elems.push(Arg::Union(UnionArg::wrapping(
            registry.any().union,
            Dir::In,
            Arg::Data(blob),
            0,
        )));
    }
    match elems.last_mut() {
        Some(Arg::Union(u)) => match u.option.as_mut() {
            Arg::Data(d) => d,
            _ => unreachable!("just ensured the trailing option is a DataArg"),
        },
        _ => unreachable!("just ensured the trailing element is a UnionArg"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squash_types::TypeCommon;

    #[test]
    fn big_endian_u32_is_byte_swapped_to_native() {
        let ty = Type::new(
            TypeCommon::scalar(4, "be32", BinaryFormat::BigEndian),
            TypeKind::Integer { pad: false },
        );
        let arg = ConstArg::new(ArgCommon::new(squash_types::TypeId(0), Dir::In, 4), 0x01020304);
        let (value, format) = squashed_value(&ty, &arg).expect("byte-swappable width");
        assert_eq!(format, BinaryFormat::NativeEndian);
        assert_eq!(value, 0x04030201);
    }

    #[test]
    fn csum_resolves_to_fixed_placeholder() {
        let ty = Type::new(TypeCommon::aggregate(8, "csum"), TypeKind::Csum);
        let arg = ConstArg::new(ArgCommon::new(squash_types::TypeId(0), Dir::In, 8), 0);
        let (value, format) = squashed_value(&ty, &arg).unwrap();
        assert_eq!(value, CSUM_PLACEHOLDER);
        assert_eq!(format, BinaryFormat::NativeEndian);
    }

    #[test]
    fn decimal_string_encoding_is_exactly_twenty_bytes() {
        let encoded = encode_const(BinaryFormat::StrDec, 42, 20).unwrap();
        assert_eq!(encoded.len(), 20);
        let text = std::str::from_utf8(&encoded).unwrap();
        assert_eq!(text.parse::<u64>().unwrap(), 42);
    }

    #[test]
    fn hex_string_encoding_is_exactly_eighteen_bytes() {
        let encoded = encode_const(BinaryFormat::StrHex, 0xff, 18).unwrap();
        assert_eq!(encoded.len(), 18);
        let text = std::str::from_utf8(&encoded).unwrap();
        assert!(text.starts_with("0x"));
        assert_eq!(u64::from_str_radix(&text[2..], 16).unwrap(), 0xff);
    }

    #[test]
    fn octal_string_encoding_is_exactly_twenty_three_bytes() {
        let encoded = encode_const(BinaryFormat::StrOct, 8, 23).unwrap();
        assert_eq!(encoded.len(), 23);
    }

    #[test]
    fn bad_unit_size_for_byte_swap_is_fatal() {
        let ty = Type::new(
            TypeCommon::scalar(3, "odd", BinaryFormat::BigEndian),
            TypeKind::Integer { pad: false },
        );
        let arg = ConstArg::new(ArgCommon::new(squash_types::TypeId(0), Dir::In, 3), 1);
        assert!(matches!(
            squashed_value(&ty, &arg),
            Err(SquashError::BadConstUnitSize(3))
        ));
    }

    /// A fatal failure partway through `squash_ptr` (here: an overlay
    /// struct) must leave `ptr` exactly as it was on entry, not with
    /// `res == None` or a partially-built, size-mismatched pointee
    /// committed in its place.
    #[test]
    fn fatal_error_leaves_pointer_arg_untouched() {
        let mut builder = squash_types::RegistryBuilder::new();
        squash_types::push_any_family(&mut builder, 8);
        let int32 = builder.push(Type::new(
            TypeCommon::scalar(4, "int32", BinaryFormat::NativeEndian),
            TypeKind::Integer { pad: false },
        ));
        let overlay = builder.push(Type::new(
            TypeCommon::aggregate(4, "overlay"),
            TypeKind::Struct {
                fields: vec![squash_types::Field::new("f", int32)],
                varlen: false,
                overlay_field: true,
            },
        ));
        let registry = builder
            .finish(squash_types::Target::new("amd64", "linux", 8))
            .unwrap();

        let field = Arg::Const(ConstArg::new(ArgCommon::new(int32, Dir::In, 4), 1));
        let pointee = Arg::Group(squash_types::GroupArg::new(
            ArgCommon::new(overlay, Dir::In, 4),
            vec![field],
        ));
        let original_size = pointee.size();
        let original_ty = registry.any().ptr64;
        let mut ptr = PointerArg::new(ArgCommon::new(original_ty, Dir::In, 8), Some(pointee), 0);

        let err = squash_ptr(&registry, &mut ptr).unwrap_err();
        assert!(matches!(err, SquashError::OverlayStruct));

        assert_eq!(ptr.common.ty, original_ty, "type must not be retargeted on failure");
        assert_eq!(ptr.vma_size, 0);
        let res = ptr.res.as_deref().expect("pointee must still be present on failure");
        assert_eq!(res.size(), original_size);
        assert!(matches!(res, Arg::Group(_)), "original untyped pointee shape must be preserved");
    }
}
