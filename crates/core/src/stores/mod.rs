pub mod http;
pub mod memory;

pub use http::HttpIndexStore;
pub use memory::MemoryIndexStore;
