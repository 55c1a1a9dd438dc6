//! User service: CRUD and level-up.

pub mod manager;

pub use manager::UserManager;
