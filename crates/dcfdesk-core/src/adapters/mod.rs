//! Provider adapters implementing [`FundamentalsSource`](crate::data_source::FundamentalsSource).

pub mod static_source;
pub mod yahoo;

pub use static_source::{StaticDataset, StaticSource};
pub use yahoo::{YahooAdapter, YahooAuthManager};
