//! nbgen - Generate CI workflows and a README status table for notebooks
//!
//! Scans a directory tree for Jupyter notebooks, renders one GitHub Actions
//! workflow per notebook (placeholder substitution plus a papermill run) and
//! a markdown status table with per-notebook descriptions and badges.

pub mod cli;
pub mod config;
pub mod error;
pub mod notebook;
pub mod pipeline;
pub mod util;
