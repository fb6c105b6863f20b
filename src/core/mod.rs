//! Core port modules
//!
//! Types, configuration, critical sections and tick accounting.

pub mod config;
pub mod critical;
pub mod cs_cell;
pub mod error;
pub mod time;
pub mod types;
