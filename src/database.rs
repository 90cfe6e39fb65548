pub mod appointment;
pub mod consent;
pub mod health;
pub mod platform;
pub mod postgres_repository;
pub mod provider;
pub mod session;
pub mod settings;
pub mod user;
