pub mod base;
pub mod masku;
pub mod sim;
pub mod traffic;
pub mod ui;
