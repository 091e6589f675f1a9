//! Request and response types

/// Comparison request, result and cache status types.
pub mod comparison;
