//! Trading-card catalog builder and sold-listing price aggregator.
//!
//! Produces a unified English/Japanese card catalog from several source
//! adapters, matches marketplace sold-listing titles back to that catalog,
//! and maintains rolling 30-day median price aggregates per (card, bucket).

pub mod aggregate;
pub mod cache;
pub mod collector;
pub mod config;
pub mod driver;
pub mod error;
pub mod http;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod providers;
pub mod reconcile;
pub mod sales_store;
pub mod title_parser;
pub mod validate;

pub use config::PipelineConfig;
pub use driver::Driver;
pub use error::{PipelineError, PipelineResult};
pub use model::{Bucket, Card, PriceAggregate, PrintingLang, Sale};
