pub mod account;
pub mod auth;
pub mod calendar;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod marketplace;
pub mod navigation;
pub mod providers;
pub mod settings;
