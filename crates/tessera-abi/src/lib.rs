//! Tessera ABI crate: stable contracts shared by the host app and runtime plugins.

pub mod backend;
pub mod ffi;
pub mod sampling;
pub mod token;

pub use backend::*;
pub use sampling::*;
pub use token::*;
