//! MIME message assembly
//!
//! - [`attachment`]: reading inline resources and attachments from disk
//! - [`builder`]: composing the multipart message and saving `.eml` copies
//! - [`types`]: parts, envelopes and the composed message

pub mod attachment;
pub mod builder;
pub mod types;

pub use attachment::ResourceAttacher;
pub use builder::MessageBuilder;
pub use types::{
    Bodies, BuildError, BuildOptions, ComposedMessage, Envelope, ResourceKind, ResourcePart,
};
