//! Core repository components
//!
//! - `object_store`: content-addressed blob storage
//! - `metadata_store`: index/refs/head/checkpoint file persistence
//! - `repository`: high-level repository operations and coordination
//! - `workspace`: working directory file system operations

pub mod metadata_store;
pub mod object_store;
pub mod repository;
pub mod workspace;
