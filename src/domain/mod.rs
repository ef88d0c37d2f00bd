//! Core domain types and logic.

pub mod capture;
pub mod engine;
pub mod error;
pub mod intent;
pub mod market;
pub mod scheduler;
pub mod training;
