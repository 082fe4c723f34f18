//! Core types for dirauth

mod user;

pub use user::*;
