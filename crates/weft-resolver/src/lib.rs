mod binder;
mod error;

pub use binder::{Binder, StandardBinder};
pub use error::BindError;
