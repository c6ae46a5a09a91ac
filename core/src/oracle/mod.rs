pub mod http;
pub mod interface;
pub mod payload;
