//! HTTP handlers, one module per surface.

pub mod credits;
pub mod generate;
pub mod generations;
pub mod presets;
pub mod webhooks;
pub mod workflows;
