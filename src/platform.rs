pub mod adapter;
pub mod backend;
