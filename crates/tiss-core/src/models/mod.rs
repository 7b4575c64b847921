//! Data models for extraction results, guide audits and configuration.

pub mod batch;
pub mod config;
pub mod guide;
