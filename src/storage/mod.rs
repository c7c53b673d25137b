//! Persistence layer: the best-effort disk shadow of the in-memory cache

pub mod disk;

pub use disk::DiskStore;
