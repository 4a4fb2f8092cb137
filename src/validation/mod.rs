//! Transaction engine - transaction types, signing, and validation rules

mod rules;
mod transaction;

pub use rules::*;
pub use transaction::*;
