//! Template rendering with variable substitution

use crate::error::{DispatchError, Result};
use crate::templates::TemplateVariables;

/// Renders body templates by substituting `{key}` placeholders
pub struct TemplateRenderer;

impl TemplateRenderer {
    /// Render a template with the provided variables
    ///
    /// `{{` and `}}` produce literal braces. A brace group that is not a
    /// plain identifier (it contains whitespace or another brace, is empty,
    /// or is never closed) is copied through untouched, so inline CSS in
    /// HTML bodies survives.
    ///
    /// # Errors
    /// Returns [`DispatchError::MissingVariable`] naming the first placeholder
    /// that has no value in `vars`.
    pub fn render(template: &str, vars: &TemplateVariables) -> Result<String> {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
            result.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") || tail.starts_with("}}") {
                result.push_str(&tail[..1]);
                rest = &tail[2..];
                continue;
            }

            if tail.starts_with('}') {
                result.push('}');
                rest = &tail[1..];
                continue;
            }

            match Self::placeholder(tail) {
                Some(key) => {
                    let value = vars
                        .get(key)
                        .ok_or_else(|| DispatchError::MissingVariable(key.to_string()))?;
                    result.push_str(value);
                    // key + both braces
                    rest = &tail[key.len() + 2..];
                }
                None => {
                    result.push('{');
                    rest = &tail[1..];
                }
            }
        }

        result.push_str(rest);
        Ok(result)
    }

    /// Placeholder name at the start of `tail`, which begins with `{`
    fn placeholder(tail: &str) -> Option<&str> {
        let body = &tail[1..];
        let end = body.find('}')?;
        let key = &body[..end];
        let is_identifier = !key.is_empty()
            && !key.contains('{')
            && !key.chars().any(char::is_whitespace);
        is_identifier.then_some(key)
    }

    /// Extract all placeholder names from a template string
    ///
    /// Returns the names found (without braces), sorted and deduplicated.
    pub fn extract_variables(template: &str) -> Vec<String> {
        let mut variables = Vec::new();
        let mut rest = template;

        while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
            let tail = &rest[pos..];
            if tail.starts_with("{{") || tail.starts_with("}}") {
                rest = &tail[2..];
            } else if tail.starts_with('}') {
                rest = &tail[1..];
            } else if let Some(key) = Self::placeholder(tail) {
                variables.push(key.to_string());
                rest = &tail[key.len() + 2..];
            } else {
                rest = &tail[1..];
            }
        }

        variables.sort();
        variables.dedup();
        variables
    }
}
