pub mod audit;
pub mod comparison;
pub mod config;
pub mod determinism;
pub mod oracle;
pub mod policy;

pub mod error;
