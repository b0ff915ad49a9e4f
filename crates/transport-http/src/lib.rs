// HTTP transport for network locators

pub mod client;
pub mod range_source;

pub use client::{HttpClient, RemoteInfo};
pub use range_source::HttpRangeSource;
