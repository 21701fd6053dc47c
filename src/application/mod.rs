pub mod cache;
pub mod projection;
pub mod session;
pub mod todo_store;
