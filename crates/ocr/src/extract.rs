use std::sync::OnceLock;

use bachat_core::Money;
use regex::Regex;

use crate::config::ExtractionConfig;
use crate::normalize::{sanitize_identifier, sanitize_value, NormalizedText};
use crate::types::{ExtractionRecord, UpiProvider, SNIPPET_CHARS};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_ref_labeled,
    r"(?i)(?:upi\s+)?transaction\s+id[\s:]*([a-z0-9-]{6,50})");
re!(re_ref_bank,
    r"\b(CIC[A-Za-z0-9]{6,18})");
re!(re_ref_generic,
    r"\b([A-Z][0-9]{6,20})\b");

re!(re_amount,
    r"(?i)(?:₹|\b(?:rs\.?|inr|amount|paid))[\s₹:]*([0-9][0-9,]*(?:\.[0-9]{1,2})?)");

re!(re_date,
    r"\b([0-9]{1,2}[-/][0-9]{1,2}[-/][0-9]{2,4})\b");
re!(re_time,
    r"\b([0-9]{1,2}:[0-9]{2}(?::[0-9]{2})?(?:[ \t]?[AaPp][Mm])?)\b");

// "Paid ₹500 to Name" / "Sent ₹500 to Name", a sentence rather than a label.
re!(re_payee_sentence,
    r"(?i)^(?:paid|sent)\b.*?\bto[\s:-]+(.+)$");

/// Reference cascade, most trusted first. Only the first match of each
/// pattern is considered.
fn reference_patterns() -> [&'static Regex; 3] {
    [re_ref_labeled(), re_ref_bank(), re_ref_generic()]
}

/// Minimum length of a sanitized transaction reference.
const MIN_REFERENCE_LEN: usize = 6;

// ── Public extraction API ─────────────────────────────────────────────────────

/// Field extractor built from an [`ExtractionConfig`].
///
/// Holds only immutable compiled tables; one instance can serve any number
/// of concurrent extractions.
#[derive(Debug, Clone)]
pub struct Extractor {
    payee_patterns: Vec<Regex>,
    providers: Vec<(UpiProvider, Vec<String>)>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractionConfig::global())
    }
}

impl Extractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        let payee_patterns = config
            .payee_labels
            .iter()
            .filter_map(|label| match Regex::new(&label_pattern(label)) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Skipping payee label '{label}': {e}");
                    None
                }
            })
            .collect();

        let providers = config
            .providers
            .iter()
            .map(|p| {
                let keywords = p.keywords.iter().map(|k| k.to_lowercase()).collect();
                (p.provider, keywords)
            })
            .collect();

        Self { payee_patterns, providers }
    }

    /// Extract structured fields from raw OCR text.
    pub fn extract(&self, raw_text: &str) -> ExtractionRecord {
        let text = NormalizedText::new(raw_text);
        self.extract_normalized(&text)
    }

    pub fn extract_normalized(&self, text: &NormalizedText) -> ExtractionRecord {
        let full = text.as_str();
        ExtractionRecord {
            transaction_id: Self::transaction_id(full),
            amount: Self::amount(full),
            date: Self::date(full),
            time: Self::time(full),
            payee_name: self.payee_name(text),
            upi_provider: self.provider(full),
            raw_text_snippet: text.snippet(SNIPPET_CHARS),
        }
    }

    // ── Reference ─────────────────────────────────────────────────────────────

    /// First pattern in the cascade whose match survives sanitizing with at
    /// least six characters. Labeled references beat shape-based guesses.
    pub fn transaction_id(text: &str) -> Option<String> {
        reference_patterns().into_iter().find_map(|re| {
            let c = re.captures(text)?;
            sanitize_identifier(c.get(1).map(|m| m.as_str()))
                .filter(|id| id.chars().count() >= MIN_REFERENCE_LEN)
        })
    }

    // ── Amount ────────────────────────────────────────────────────────────────

    /// First currency-marked number in document order. Unparseable numbers
    /// yield `None`, never zero.
    pub fn amount(text: &str) -> Option<Money> {
        let c = re_amount().captures(text)?;
        Money::parse(c.get(1)?.as_str()).ok()
    }

    // ── Date / time ──────────────────────────────────────────────────────────

    pub fn date(text: &str) -> Option<String> {
        let c = re_date().captures(text)?;
        sanitize_value(c.get(1).map(|m| m.as_str()))
    }

    pub fn time(text: &str) -> Option<String> {
        let c = re_time().captures(text)?;
        sanitize_value(c.get(1).map(|m| m.as_str()))
    }

    // ── Payee ─────────────────────────────────────────────────────────────────

    /// Labels are tried in declared order; within a label, lines top to
    /// bottom. Falls back to a "Paid ... to Name" sentence.
    pub fn payee_name(&self, text: &NormalizedText) -> Option<String> {
        self.payee_patterns
            .iter()
            .find_map(|re| text.lines().find_map(|line| capture_value(re, line)))
            .or_else(|| {
                text.lines()
                    .find_map(|line| capture_value(re_payee_sentence(), line))
            })
    }

    // ── Provider ──────────────────────────────────────────────────────────────

    pub fn provider(&self, text: &str) -> Option<UpiProvider> {
        let lower = text.to_lowercase();
        self.providers
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|(provider, _)| *provider)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// `^<label>[\s:-]+(.+)$`, case-insensitive, any whitespace between label words.
fn label_pattern(label: &str) -> String {
    let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
    format!(r"(?i)^{}[\s:-]+(.+)$", words.join(r"\s+"))
}

fn capture_value(re: &Regex, line: &str) -> Option<String> {
    let c = re.captures(line)?;
    sanitize_value(c.get(1).map(|m| m.as_str()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
