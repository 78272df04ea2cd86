#![doc = include_str!("../README.md")]

mod connect;
mod engine;
mod error;
mod handler;
mod record;

pub use crate::connect::*;
pub use crate::engine::*;
pub use crate::error::*;
pub use crate::handler::*;
pub use crate::record::*;
