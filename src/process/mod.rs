// src/process/mod.rs

//! Process definitions and the status values shared across the engine.

pub mod definition;
pub mod status;

pub use definition::{
    FsTrigger, ProcessDefinition, ProcessTrigger, TriggerKind, DEFAULT_TIMEOUT_ON_EXIT,
};
pub use status::{ProcessEvent, ProcessStatus};
