//! Real-time monitoring of the oFono object directory.
//!
//! This module tracks which modems exist so that rebindable proxies can
//! follow them as they are added and removed.

pub mod directory;
