//! Core types for governance proposal notifications.

pub mod extract;
pub mod proposal;
pub mod symbol;
pub mod text;

pub use extract::*;
pub use proposal::*;
pub use symbol::*;
pub use text::*;
