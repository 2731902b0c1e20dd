pub mod audio;
pub mod filters;
pub mod handlers;
pub mod queries;
