//! Shared types for emulator cores.
//!
//! Cores publish their state through [`Observable`] so debuggers and test
//! harnesses can inspect any of them the same way.

mod observable;

pub use observable::{Observable, Value};
