//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the framework:
//! - Math types and projection helpers
//! - Frame timing
//! - Logging setup

pub mod math;
pub mod time;
pub mod logging;
