//! Foundation utilities shared by every subsystem: math aliases and logging bootstrap.

pub mod math;
pub mod logging;
