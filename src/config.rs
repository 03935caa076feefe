/// Default limit on nested function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 512;

/// Syntax nested deeper than this is rejected while parsing, which keeps
/// every later walk over the tree (and dropping it) shallow.
pub const MAX_NESTING_DEPTH: usize = 256;

/// If less than this much stack remains, grow it before recursing (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Stack space added per growth (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterConfig {
    /// Calls nested deeper than this fail with `ResourceExhausted`.
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self { max_call_depth: DEFAULT_MAX_CALL_DEPTH }
    }
}

impl InterpreterConfig {
    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }
}

/// Runs `f` on a stack with at least [RED_ZONE] bytes left, so deeply nested
/// programs hit the call-depth limit instead of overflowing the host stack.
#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_host_recursion_survives() {
        fn deep(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { deep(n - 1) + 1 })
        }

        assert_eq!(deep(50_000), 50_000);
    }

    #[test]
    fn builder_overrides_default() {
        assert_eq!(InterpreterConfig::default().max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert_eq!(InterpreterConfig::default().with_max_call_depth(8).max_call_depth, 8);
    }
}
