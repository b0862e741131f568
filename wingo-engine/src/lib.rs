pub mod backtest;
pub mod config;
pub mod export;
pub mod outcome;
pub mod patterns;
pub mod session;
pub mod strategy;
