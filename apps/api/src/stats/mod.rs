pub mod compute;
pub mod handlers;
pub mod queries;
