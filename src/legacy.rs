pub mod adapter;
pub mod client;
