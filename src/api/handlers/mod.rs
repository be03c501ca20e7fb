pub mod contact;
pub mod health;
pub mod platform;
pub mod session;
