pub mod fixture;
pub mod http;

pub use fixture::FixtureFetcher;
pub use http::HttpFetcher;
