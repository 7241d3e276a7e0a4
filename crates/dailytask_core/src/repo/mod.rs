//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the task store contract consumed by services and the scheduler.
//! - Isolate SQLite query details from business orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod task_repo;
