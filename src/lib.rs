// src/lib.rs

//! Tree-structured command line argument sets.
//!
//! Projects hold groups and parameters (arguments, environment variables,
//! working directories and launch applications) with tri-state check boxes.
//! The [`core::view_model::TreeViewModel`] runs the editing commands, keeps an
//! undo history and drives persistence to `*.args.json` files and the
//! aggregation of the checked items into a launch configuration.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
