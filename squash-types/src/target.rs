//! Target description: the architecture/OS pair a [`crate::Registry`] is compiled for.

/// Identifies the architecture + OS combination a [`crate::Registry`] was
/// built for.
///
/// This is the "configuration" surface of the type registry: everything
/// else (the any-family bootstrap, the two any-pointer widths) is derived
/// from the `ptr_size` carried here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Short architecture name, e.g. `"amd64"`, `"arm64"`.
    pub arch: String,
    /// Short OS name, e.g. `"linux"`, `"darwin"`.
    pub os: String,
    /// Width in bytes of a native pointer on this target.
    pub ptr_size: u64,
}

impl Target {
    /// Construct a new target description.
    pub fn new(arch: impl Into<String>, os: impl Into<String>, ptr_size: u64) -> Self {
        Self {
            arch: arch.into(),
            os: os.into(),
            ptr_size,
        }
    }
}
