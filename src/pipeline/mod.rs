pub mod collector;
pub mod generator;
pub mod readme;
pub mod workflow;
