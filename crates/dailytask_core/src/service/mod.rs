//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep routers decoupled from storage details.

pub mod recurrence;
pub mod stats_service;
pub mod task_service;
