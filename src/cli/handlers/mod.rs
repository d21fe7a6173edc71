// src/cli/handlers/mod.rs

pub mod commons;
pub mod eval;
pub mod export;
pub mod import;
pub mod tree;
