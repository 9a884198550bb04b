pub mod client;
pub mod ranking;
