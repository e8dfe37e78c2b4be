//! Message templates
//!
//! Named-placeholder substitution for the text and HTML bodies of each
//! outgoing message.

pub mod renderer;
pub mod types;

pub use renderer::TemplateRenderer;
pub use types::{TemplateVariables, Templates, DEFAULT_HTML_TEMPLATE, DEFAULT_TEXT_TEMPLATE};
