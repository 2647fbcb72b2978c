// Copyright 2023 Gregory Szorc.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Type registry and argument graph data model for any-pointer squashing.
//!
//! This crate defines the typed-argument data model that the
//! `squash-core` classifier and squasher consume: [`Type`] descriptors
//! living in an immutable per-[`Target`] [`Registry`], and [`Arg`]
//! nodes forming the concrete-value tree of one call's arguments.
//!
//! # Minimal by Design
//!
//! This crate purposefully omits the descriptor compiler that would
//! normally produce a finished [`Registry`] from a syscall description
//! language; it receives a finished type table (see
//! [`RegistryBuilder`]) and exposes the data model that table is
//! expressed in. [`push_any_family`] is provided so that callers
//! without their own descriptor compiler integration can still
//! assemble a conforming `ANYPTRS` any-family.
//!
//! # Type Flavors
//!
//! Every [`Type`] pairs [`TypeCommon`] layout fields (size, name,
//! binary format, bitfield position, unit size) with a [`TypeKind`]
//! discriminant carrying variant-specific data (struct/union field
//! lists, a pointer's element, an array's length policy). Inter-type
//! edges are [`TypeId`] indices into the owning [`Registry`]'s arena
//! rather than borrowed references, so that a cyclic type graph
//! (Ptr -> Array -> Union -> Ptr, as in the any-family) can live in a
//! single `Vec` without self-referential borrows.
//!
//! # Note on the Any-Family
//!
//! The [`Registry`] must contain a union named `ANYPTRS` with the
//! exact shape documented on [`RegistryBuilder::finish`]; its absence
//! or malformation is a schema violation reported as a
//! [`RegistryError`], not silently tolerated.

mod arg;
mod builtin;
mod format;
mod prog;
mod registry;
mod target;
mod ty;

pub use arg::{
    Arg, ArgCommon, ArgCtx, ConstArg, DataArg, Dir, GroupArg, PointerArg, ResultArg, UnionArg,
};
pub use builtin::push_any_family;
pub use format::BinaryFormat;
pub use prog::{Call, Prog};
pub use registry::{
    AnyTypes, Registry, RegistryBuilder, RegistryError, ANYPTRS_NAME, ANY_UNION_FIELD_NAMES,
};
pub use target::Target;
pub use ty::{ArrayLen, Field, Type, TypeCommon, TypeId, TypeKind};
