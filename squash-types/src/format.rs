//! Binary encoding of integer-valued arguments.

use core::fmt::{Display, Formatter};

/// The on-the-wire encoding of an integer-valued [`crate::Type`].
///
/// Native and big-endian formats encode a fixed-width binary integer;
/// the three string formats encode a decimal, hex, or octal ASCII
/// representation of the value, zero-padded to a fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryFormat {
    #[default]
    NativeEndian,
    BigEndian,
    StrDec,
    StrHex,
    StrOct,
}

impl Display for BinaryFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::NativeEndian => "native",
            Self::BigEndian => "big-endian",
            Self::StrDec => "decimal string",
            Self::StrHex => "hex string",
            Self::StrOct => "octal string",
        };
        f.write_str(s)
    }
}
