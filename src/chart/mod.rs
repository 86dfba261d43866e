//! The periodontal chart: record types, incremental merge, persistence.

pub mod merger;
pub mod record;
pub mod store;
