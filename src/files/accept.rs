use glob::{MatchOptions, Pattern};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
enum AcceptRule {
    /// `.png`, `.tar.gz`; matched against the file name.
    Extension(Pattern),
    /// `image/png`, `image/*`; matched against the MIME type.
    Mime(Pattern),
}

/// Allow-list of MIME types and extensions in the `accept="image/*,.pdf"` format.
#[derive(Debug, Clone, Default)]
pub struct AcceptPattern {
    source: String,
    rules: Vec<AcceptRule>,
    extensions: Vec<String>,
}

impl AcceptPattern {
    pub fn parse(accept: &str) -> Self {
        let mut rules = Vec::new();
        let mut extensions = Vec::new();

        for token in accept.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token == "*" || token == "*/*" {
                // Wildcard accepts everything; an empty rule set means the same.
                return Self {
                    source: accept.to_string(),
                    ..Default::default()
                };
            }

            if !token.contains('/') {
                extensions.push(token.trim_start_matches('.').to_lowercase());
            }

            let rule = if token.starts_with('.') {
                Pattern::new(&format!("*{}", Pattern::escape(token))).map(AcceptRule::Extension)
            } else if token.contains('/') {
                Pattern::new(token).map(AcceptRule::Mime)
            } else {
                Pattern::new(&format!("*.{}", Pattern::escape(token))).map(AcceptRule::Extension)
            };

            match rule {
                Ok(rule) => rules.push(rule),
                Err(e) => tracing::warn!(token, "ignoring invalid accept token: {}", e),
            }
        }

        Self {
            source: accept.to_string(),
            rules,
            extensions,
        }
    }

    pub fn from_config(accept: Option<&str>) -> Self {
        accept.map(Self::parse).unwrap_or_default()
    }

    pub fn accepts_all(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn matches(&self, name: &str, mime: &str) -> bool {
        if self.accepts_all() {
            return true;
        }

        let mime = mime.split(';').next().unwrap_or(mime).trim();
        self.rules.iter().any(|rule| match rule {
            AcceptRule::Extension(pattern) => pattern.matches_with(name, MATCH_OPTIONS),
            AcceptRule::Mime(pattern) => pattern.matches_with(mime, MATCH_OPTIONS),
        })
    }

    /// Extensions named by the pattern, without the leading dot. Used for dialog filters.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pattern_accepts_everything() {
        let accept = AcceptPattern::from_config(None);
        assert!(accept.matches("anything.bin", "application/octet-stream"));
        assert!(AcceptPattern::parse("*/*").accepts_all());
    }

    #[test]
    fn extension_rules_match_case_insensitively() {
        let accept = AcceptPattern::parse(".png, .tar.gz");
        assert!(accept.matches("photo.PNG", "image/png"));
        assert!(accept.matches("backup.tar.gz", "application/gzip"));
        assert!(!accept.matches("notes.txt", "text/plain"));
        assert_eq!(accept.extensions(), ["png", "tar.gz"]);
    }

    #[test]
    fn mime_rules_support_wildcards_and_parameters() {
        let accept = AcceptPattern::parse("image/*,application/pdf");
        assert!(accept.matches("a.jpg", "image/jpeg"));
        assert!(accept.matches("doc", "application/pdf; charset=binary"));
        assert!(!accept.matches("song.mp3", "audio/mpeg"));
    }
}
