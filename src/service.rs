pub mod consent;
pub mod facade;
pub mod portal;
pub mod registry;
