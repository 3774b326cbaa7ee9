//! Test support: stub collaborators and on-disk dataset fixtures.
//!
//! Compiled into the library so integration tests can share it.

pub mod fixtures;
