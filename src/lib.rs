//! Cache-first, bounded-time data acquisition for a finance dashboard.
//!
//! A [`providers::DataService`] call returns the freshest value it can get
//! for one logical resource: a fresh cache hit, a newly fetched and
//! normalized value, or the last cached value when every fetch strategy
//! failed. It never returns an error; `None` means no data.

pub mod batch;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod providers;
