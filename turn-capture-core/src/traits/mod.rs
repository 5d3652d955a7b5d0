pub mod capture_host;
pub mod connector;
pub mod stream_sink;
