pub mod cascade;
pub mod csv;
pub mod filters;
pub mod handlers;
