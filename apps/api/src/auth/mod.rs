pub mod handlers;
pub mod routing;
pub mod session;
pub mod validation;
