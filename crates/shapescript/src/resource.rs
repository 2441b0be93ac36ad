//! Recursion-depth and cancellation checking for one evaluation (spec §4.6 "Recursion",
//! §5 "Cancellation / timeout").
//!
//! ShapeScript has no heap object model of its own — geometry lives behind
//! [`crate::delegate::MeshLibrary`] and values are plain Rust types — so there is nothing
//! here to track allocations, memory, or GC intervals against. What a long-running
//! evaluation still needs policed is the two hard bounds the language actually
//! documents: how deep block/function calls may nest, and whether the host has asked
//! evaluation to stop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Recommended maximum recursion depth if not otherwise specified (spec §4.6
/// "depth-bounded (implementation-defined, e.g., 256)").
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 256;

/// Error returned when a resource limit is exceeded during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// Block/function call nesting exceeded the configured depth.
    Recursion { limit: usize, depth: usize },
    /// The host's cancellation token was observed set.
    Cancelled,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recursion { limit, depth } => write!(f, "recursion limit exceeded: {depth} > {limit}"),
            Self::Cancelled => write!(f, "evaluation was cancelled"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// A cooperative stop flag a host can share with the evaluator (spec §5 "the delegate
/// may provide a cancellation token polled at statement boundaries").
///
/// Cloning shares the same underlying flag; `cancel` may be called from a different
/// thread than the one running the evaluator, which stays single-threaded itself (spec
/// §5 "Scheduling" — only the flag crosses threads, never interpreter state).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Policed limits for one evaluation run, checked at the statement/call boundaries the
/// evaluator already visits.
pub trait ResourceTracker: fmt::Debug {
    /// Called before pushing a new block/function call frame.
    ///
    /// `current_depth` is the depth before the new frame is pushed.
    fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError>;

    /// Called at statement boundaries and inside long loops.
    fn check_cancelled(&self) -> Result<(), ResourceError>;
}

/// The default tracker: a fixed recursion cap, no cancellation source.
#[derive(Debug, Clone, Copy)]
pub struct NoLimitTracker {
    max_recursion_depth: usize,
}

impl Default for NoLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl NoLimitTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl ResourceTracker for NoLimitTracker {
    fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        if current_depth >= self.max_recursion_depth {
            Err(ResourceError::Recursion {
                limit: self.max_recursion_depth,
                depth: current_depth + 1,
            })
        } else {
            Ok(())
        }
    }

    fn check_cancelled(&self) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// Configuration for an evaluation's resource limits, built by the host (e.g. the CLI's
/// `--max-recursion` flag).
#[derive(Debug, Clone, Default)]
pub struct ResourceLimits {
    pub max_recursion_depth: Option<usize>,
    pub cancellation: Option<CancellationToken>,
}

impl ResourceLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// A tracker built from explicit [`ResourceLimits`], used whenever a host supplies a
/// recursion cap or a cancellation token.
#[derive(Debug, Clone)]
pub struct LimitedTracker {
    limits: ResourceLimits,
}

impl LimitedTracker {
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }
}

impl ResourceTracker for LimitedTracker {
    fn check_recursion_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        let max = self.limits.max_recursion_depth.unwrap_or(DEFAULT_MAX_RECURSION_DEPTH);
        if current_depth >= max {
            Err(ResourceError::Recursion {
                limit: max,
                depth: current_depth + 1,
            })
        } else {
            Ok(())
        }
    }

    fn check_cancelled(&self) -> Result<(), ResourceError> {
        match &self.limits.cancellation {
            Some(token) if token.is_cancelled() => Err(ResourceError::Cancelled),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_limit_tracker_allows_shallow_recursion() {
        let tracker = NoLimitTracker::new();
        assert!(tracker.check_recursion_depth(0).is_ok());
        assert!(tracker.check_recursion_depth(DEFAULT_MAX_RECURSION_DEPTH - 1).is_ok());
    }

    #[test]
    fn no_limit_tracker_rejects_deep_recursion() {
        let tracker = NoLimitTracker::new();
        assert!(tracker.check_recursion_depth(DEFAULT_MAX_RECURSION_DEPTH).is_err());
    }

    #[test]
    fn limited_tracker_honors_configured_cap() {
        let tracker = LimitedTracker::new(ResourceLimits::new().with_max_recursion_depth(4));
        assert!(tracker.check_recursion_depth(3).is_ok());
        assert!(tracker.check_recursion_depth(4).is_err());
    }

    #[test]
    fn cancellation_token_is_observed() {
        let token = CancellationToken::new();
        let tracker = LimitedTracker::new(ResourceLimits::new().with_cancellation(token.clone()));
        assert!(tracker.check_cancelled().is_ok());
        token.cancel();
        assert!(matches!(tracker.check_cancelled(), Err(ResourceError::Cancelled)));
    }
}
