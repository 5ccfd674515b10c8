pub mod agent;
pub mod catalog;
pub mod health;
pub mod settings;
