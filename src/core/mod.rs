// src/core/mod.rs

pub mod aggregation;
pub mod backend;
pub mod clipboard;
pub mod debounce;
pub mod evaluation;
pub mod events;
pub mod history;
pub mod node;
pub mod reconcile;
pub mod serializer;
pub mod settings;
pub mod storage;
pub mod tree;
pub mod view_model;
