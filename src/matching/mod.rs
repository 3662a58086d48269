pub mod engine;
pub mod loader;
pub mod manager;
pub mod policy;
pub mod queue;
pub mod similarity;
pub mod tokenize;
