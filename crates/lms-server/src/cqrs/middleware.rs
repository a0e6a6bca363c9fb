//! Marker traits separating writes from reads
//!
//! Commands change state and run inside a transaction; queries only read.
//! Both are dispatched through the same mediator.

/// A request that modifies state
pub trait Command {}

/// A request that only reads state
pub trait Query {}
