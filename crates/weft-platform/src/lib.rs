//! Weft Platform
//!
//! Model nodes reach external provider platforms through two traits:
//!
//! - [`PlatformStrategy`] knows how to talk to one platform family and
//!   produces an invoker bound to a specific [`Credential`].
//! - [`ModelInvoker`] is that bound invoker, called once per node run.
//!
//! Strategies are looked up by platform tag in a [`PlatformRegistry`]. The
//! binder only ever asks the registry; adding a platform means registering a
//! strategy, nothing else.
//!
//! [`Credential`]: weft_credential::Credential

mod echo;
mod error;
mod func;
mod registry;
mod request;
mod strategy;

pub use echo::EchoPlatform;
pub use error::InvokeError;
pub use func::FnPlatform;
pub use registry::PlatformRegistry;
pub use request::{Completion, CompletionRequest};
pub use strategy::{ModelInvoker, PlatformStrategy};

/// Platform tags known to the definition editor.
///
/// Only [`ECHO`](platforms::ECHO) ships with a strategy; the others are
/// registration keys for embedders that provide network-backed strategies.
pub mod platforms {
  pub const ECHO: &str = "echo";
  pub const OPENAI: &str = "OpenAI";
  pub const OLLAMA: &str = "Ollama";
  pub const YIYAN: &str = "YiYan";
  pub const XINGHUO: &str = "XingHuo";
  pub const TONGYI: &str = "TongYi";
  pub const DEEPSEEK: &str = "DeepSeek";
  pub const ZHIPU: &str = "ZhiPu";
}
