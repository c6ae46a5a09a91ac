pub mod aggregate;
pub mod model;
pub mod normalize;
pub mod rank;
pub mod render;
pub mod schema;
pub mod workflow;
