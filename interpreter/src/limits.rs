/// Upper bound on both the arguments of a call and the parameters of a function.
pub(crate) const MAX_ARITY: usize = 255;

/// Calls nested deeper than this raise "Stack overflow." instead of exhausting the native stack.
pub(crate) const MAX_CALL_DEPTH: usize = 256;
