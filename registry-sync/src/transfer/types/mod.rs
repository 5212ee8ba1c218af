//! Core types for the spreadsheet → registry transfer

mod declaration;
mod record;
mod scope;
mod value;

pub use declaration::*;
pub use record::*;
pub use scope::*;
pub use value::*;
