pub mod http_remote;
pub mod memory_collection;
pub mod sqlite_store;
