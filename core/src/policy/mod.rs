pub mod allowlist;
pub mod egress;
pub mod types;
