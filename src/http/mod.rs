pub mod fetcher;
pub mod rate_limiter;

pub use fetcher::{FetcherConfig, HttpFetcher};
pub use rate_limiter::Throttle;
