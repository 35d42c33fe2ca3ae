pub mod register;
pub mod node;
pub mod graph;
pub mod linker;
pub mod exports;
pub mod scheduler;
pub mod core;
pub mod loader;
