//! Tracing and structured logging (shared setup).

/// Initialize process-wide observability with the default `info` filter.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Tracing configuration (filters, layers).
pub mod tracing;
