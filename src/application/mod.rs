//! Application services layer.

pub mod admins;
pub mod contact;
pub mod error;
pub mod repos;
pub mod site;
pub mod sync;
