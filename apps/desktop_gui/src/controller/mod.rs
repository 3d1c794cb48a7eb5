//! Controller layer: UI events and command orchestration around the workflow.

pub mod events;
pub mod orchestration;
