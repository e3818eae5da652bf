mod usd;

pub mod helpers;
pub mod op;

pub use usd::{Usd, UsdConversionError};
