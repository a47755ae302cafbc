pub mod choco;
pub mod engine;
pub mod execution;
pub mod models;
pub mod scheduler;
pub mod settings;
