//! Property-typed particle data containers with copy-on-write sharing.
//!
//! The building blocks are [PropertyStore](core::PropertyStore) (a named,
//! typed per-particle data buffer), [DataCollection](core::DataCollection)
//! (an insertion-ordered set of properties and structural objects
//! representing one pipeline state) and
//! [CutoffNeighborFinder](core::CutoffNeighborFinder) (a per-center query
//! over neighbors within a cutoff, periodic images included). Collections
//! share their members by reference; every mutation path clones shared data
//! first, so older pipeline snapshots keep observing the values they were
//! created with.

pub mod core;
pub mod io;

pub mod prelude {
    pub use crate::core::*;
    pub use crate::io::*;
}
