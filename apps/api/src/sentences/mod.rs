pub mod allocation;
pub mod handlers;
pub mod queries;
