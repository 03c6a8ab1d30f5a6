// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Utility modules
//!
//! Terminal helpers for the plugflow CLI.

pub mod colors;
pub mod progress;

pub use colors::*;
pub use progress::*;
