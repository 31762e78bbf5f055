use bachat_core::Money;
use serde::{Deserialize, Serialize};

/// Length of the audit snippet, in characters.
pub const SNIPPET_CHARS: usize = 1000;

/// UPI app whose confirmation screen produced the text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UpiProvider {
    Gpay,
    Phonepe,
}

impl std::fmt::Display for UpiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpiProvider::Gpay => write!(f, "gpay"),
            UpiProvider::Phonepe => write!(f, "phonepe"),
        }
    }
}

impl std::str::FromStr for UpiProvider {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpay" => Ok(UpiProvider::Gpay),
            "phonepe" => Ok(UpiProvider::Phonepe),
            other => Err(format!("Unknown UPI provider: '{other}'")),
        }
    }
}

/// Best-effort fields read from a payment screenshot.
///
/// Every optional field is either well-formed or `None`; an empty string never
/// stands in for "not found". `raw_text_snippet` is kept for the admin audit
/// trail only.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRecord {
    pub transaction_id: Option<String>,
    pub amount: Option<Money>,
    /// Verbatim date token, not calendar-validated.
    pub date: Option<String>,
    /// Verbatim time token.
    pub time: Option<String>,
    pub payee_name: Option<String>,
    pub upi_provider: Option<UpiProvider>,
    pub raw_text_snippet: String,
}

impl ExtractionRecord {
    /// The record returned when the engine could not be created or the image
    /// could not be read.
    pub fn degraded() -> Self {
        Self::default()
    }

    pub fn is_degraded(&self) -> bool {
        self.missing_fields().len() == 6 && self.raw_text_snippet.is_empty()
    }

    /// Names of the optional fields that were not found, in serialized form.
    /// The upload form leaves these blank for manual entry.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.transaction_id.is_none() {
            missing.push("transactionId");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        if self.time.is_none() {
            missing.push("time");
        }
        if self.payee_name.is_none() {
            missing.push("payeeName");
        }
        if self.upi_provider.is_none() {
            missing.push("upiProvider");
        }
        missing
    }
}
