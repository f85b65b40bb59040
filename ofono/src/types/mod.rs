//! Type definitions and constants.
//!
//! This module contains oFono interface names and protocol constants.

pub mod constants;
