//! Core chatdesk types

pub mod intake;
pub mod message;
pub mod mode;
pub mod page;

pub use intake::*;
pub use message::*;
pub use mode::*;
pub use page::*;
