pub mod clock;
pub mod config;
pub mod error;
pub mod feed;
pub mod runner;
pub mod sync;
