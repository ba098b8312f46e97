pub mod navigate;
pub mod platform;
pub mod session;
