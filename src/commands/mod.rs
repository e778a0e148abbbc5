pub mod admin;
pub mod menu;
pub mod orders;
