//! # Repository Module
//!
//! Repository implementations over the SQLite pool.
//!
//! ## Available Repositories
//!
//! - [`kv::KeyValueRepository`] - `local_storage` rows behind [`crate::LocalStorage`]

pub mod kv;
