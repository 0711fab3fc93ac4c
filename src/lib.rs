//! Monthly sentiment scoring, rankings and flight-risk detection over an
//! employee message log.

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod records;
pub mod report;
pub mod risk;

pub use aggregate::aggregate;
pub use error::EngineError;
pub use ranking::rank_top;
pub use risk::detect;
