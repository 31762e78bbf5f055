/// Recognized text with carriage returns and other control characters removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    text: String,
}

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        let text = raw
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();
        Self { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Trimmed, non-empty lines. Each call starts a fresh pass.
    pub fn lines(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.text.split('\n').map(str::trim).filter(|l| !l.is_empty())
    }

    /// The first `limit` characters. Never splits a character.
    pub fn snippet(&self, limit: usize) -> String {
        self.text.chars().take(limit).collect()
    }
}

/// Collapse whitespace runs to a single space and trim.
pub fn sanitize_value(value: Option<&str>) -> Option<String> {
    let collapsed = value?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Strip whitespace, hyphens, colons and periods from a code.
pub fn sanitize_identifier(value: Option<&str>) -> Option<String> {
    let stripped: String = value?
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | ':' | '.'))
        .collect();
    (!stripped.is_empty()).then_some(stripped)
}
