pub mod assignment;
pub mod cache;
pub mod clock;
pub mod config;
pub mod credit_signals;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod event;
pub mod income_signals;
pub mod model;
pub mod persona;
pub mod prioritizer;
pub mod savings_signals;
pub mod signals;
pub mod store;
pub mod subscription_signals;
pub mod trace;
pub mod types;
pub mod window;
