pub mod account;
pub mod appointment;
pub mod consent;
pub mod contract;
pub mod health;
pub mod provider;
pub mod session;
pub mod settings;
pub mod user;
