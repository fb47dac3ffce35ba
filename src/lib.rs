extern crate alloc;

pub mod auth;
pub mod cache;
pub mod cmds;
mod constructors;
pub mod entities;
pub mod image_host;
pub mod join;
pub mod repositories;
pub mod screens;
pub mod store;
pub(crate) mod utils;

pub use constructors::*;
