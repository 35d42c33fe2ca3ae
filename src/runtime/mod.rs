pub mod store;
pub mod processor;
pub mod engine;
pub mod integrated;
