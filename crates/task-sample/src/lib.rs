//! # Task Tracker Sample
//!
//! A small task tracker built on `resource_bridge`. This library exposes its modules for the
//! demo binary and for integration testing.

pub mod clients;
pub mod error;
pub mod lifecycle;
pub mod model;
