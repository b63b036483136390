//! Domain types shared across RealWorld services.
//!
//! Pure types with no framework dependencies.

pub mod id;
