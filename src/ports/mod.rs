//! Port traits consumed by the core.

pub mod config_port;
pub mod store_port;
pub mod venue_port;
