pub mod file_storage;
pub mod http;

pub use file_storage::FileStorage;
pub use http::HttpApiClient;
