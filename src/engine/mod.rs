//! Presentation and orchestration around the converge engine
//!
//! 1. Rendering - Show the plan grouped by category, secrets masked
//! 2. Executing - Confirm, apply with progress, summarize
//! 3. Bootstrapping - Run the control plane installers in parallel

pub mod bootstrap;
pub mod executor;
pub mod render;

pub use executor::{ApplyOptions, execute};
