mod macros;

pub mod availability_slot;
pub mod clock;
pub mod coherence;
pub mod collaborators;
pub mod config;
pub mod session;
pub mod uuid_service;
pub mod weekly_pattern;
