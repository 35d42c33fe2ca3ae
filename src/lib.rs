pub mod error;
pub mod dsl;
pub mod steps;
pub mod compiler;
pub mod runtime;
