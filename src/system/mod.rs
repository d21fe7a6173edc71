// src/system/mod.rs

//! # File System Layer
//!
//! - **`file_storage`**: [`file_storage::JsonFileStorage`], the `FileStorage`
//!   implementation that reads and writes the `*.args.json` files and the
//!   solution settings file.
//! - **`watcher`**: `notify` watchers on those files that report external
//!   changes and stay quiet while the store writes.

pub mod file_storage;
pub mod watcher;
