//! Calls and programs: the top-level containers of the argument graph.

use crate::arg::Arg;

/// One system-call invocation and its arguments.
#[derive(Debug, Clone)]
pub struct Call {
    /// Index of the syscall being invoked (meaning is owned by the
    /// descriptor compiler's syscall table, opaque to this crate).
    pub meta_id: u64,
    pub args: Vec<Arg>,
}

impl Call {
    pub fn new(meta_id: u64, args: Vec<Arg>) -> Self {
        Self { meta_id, args }
    }
}

/// A sequence of calls forming one fuzzer program.
#[derive(Debug, Clone, Default)]
pub struct Prog {
    pub calls: Vec<Call>,
}

impl Prog {
    pub fn new(calls: Vec<Call>) -> Self {
        Self { calls }
    }
}
