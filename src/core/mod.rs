//! Core functionality for decoding, fingerprinting and comparing images

/// Bounded, time-expiring result cache.
pub mod cache;
/// The comparison orchestrator.
pub mod compare;
/// Base64 image decoding and normalization.
pub mod decode;
/// Cache fingerprints for image pairs.
pub mod hash;
pub mod model;
pub mod reply;
