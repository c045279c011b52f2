//! Reference signal generation.
//!
//! The engine treats signals as opaque input. This module provides one
//! concrete [`SignalSource`](candlelab_core::engine::SignalSource) so runs
//! can be driven end-to-end from the CLI.

pub mod indicators;
pub mod reference;

pub use reference::{ReferenceConfig, ReferenceSource};
