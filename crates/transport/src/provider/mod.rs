//! Schedule sources.

pub mod static_provider;

pub use static_provider::StaticScheduleProvider;
