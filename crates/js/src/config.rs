//! Construction-time limits for the sandboxed JS runner.

/// Defensive bounds on handler execution. The sandbox has no external event loop to
/// enforce a true wall-clock timeout against synchronous script execution, so runaway
/// loops/recursion are bounded via `boa_engine`'s runtime limits instead — a handler that
/// trips one fails with `HandlerError::Timeout` rather than hanging the worker thread.
#[derive(Debug, Clone)]
pub struct JsRunnerConfig {
    /// Handler source larger than this is rejected before compilation.
    pub max_source_bytes: usize,
    /// Upper bound on loop iterations within a single handler invocation.
    pub loop_iteration_limit: u64,
    /// Upper bound on recursive call depth within a single handler invocation.
    pub recursion_limit: usize,
}

impl Default for JsRunnerConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: 256 * 1024,
            loop_iteration_limit: 10_000_000,
            recursion_limit: 1024,
        }
    }
}
