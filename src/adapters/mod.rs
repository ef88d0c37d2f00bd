//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod ig_venue_adapter;
pub mod sqlite_store_adapter;
