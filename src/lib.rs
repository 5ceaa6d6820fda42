// Library interface for testing
pub mod algorithms;
pub mod backend;
pub mod mining;
pub mod x16r;
