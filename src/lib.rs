pub mod dsl;
pub mod generator;
pub mod graph;
