//! Weft Credential
//!
//! Credentials authenticate node invocations against an external model
//! platform. The [`CredentialDirectory`] trait is the lookup seam the binder
//! consults at compile time; execution never touches it.

mod credential;
mod directory;
mod memory;

pub use credential::{Credential, CredentialId};
pub use directory::{CredentialDirectory, DirectoryError};
pub use memory::MemoryDirectory;
