//! A `boa_engine`-backed sandbox for the workflow engine's JS Handler Runner contract.

pub mod config;
pub mod http_bridge;
pub mod runner;

pub use config::JsRunnerConfig;
pub use runner::BoaJsHandlerRunner;
