//! Tag extraction
//!
//! Captures the content of the first `<tag>...</tag>` section of a text.
//! Matching is case-insensitive, spans lines and tolerates whitespace inside
//! the angle brackets (`< tag >`, `</ tag >`).

use regex::Regex;

/// Compiled matcher for one tag name
#[derive(Debug, Clone)]
pub struct TagPattern {
    tag: String,
    regex: Regex,
}

impl TagPattern {
    pub fn new(tag: &str) -> Result<Self, regex::Error> {
        let escaped = regex::escape(tag);
        let regex = Regex::new(&format!(
            r"(?is)<\s*{tag}\s*>(.*?)<\s*/\s*{tag}\s*>",
            tag = escaped
        ))?;

        Ok(Self {
            tag: tag.to_string(),
            regex,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Content of the first matching section, or an empty string
    pub fn extract(&self, text: &str) -> String {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }
}
