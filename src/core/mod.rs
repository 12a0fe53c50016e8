//! Core types for the build step pipeline: builder, context, and error handling.

pub mod builder;
pub mod context;
pub mod error;

pub use builder::{Stage, StepOutcome, TestStep, TestStepBuilder};
pub use context::BuildContext;
pub use error::{Error, Result};
