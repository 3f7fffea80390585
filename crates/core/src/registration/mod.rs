//! Invoice registration number validation.
//!
//! A registration number is a seller identifier issued by the tax
//! authority: the letter `T` followed by 13 digits. Format checking is
//! syntactic and always fatal; whether a number the registry rejects blocks
//! the save depends on the trust level of the request, decided in
//! [`gate_registration`]. The registry lookup itself is performed by the
//! caller through [`kicho_shared::registry::RegistryVerifier`]; this module
//! interprets the result and stamps the header annotations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use kicho_shared::registry::RegistryRecord;

use crate::ledger::error::LedgerError;
use crate::ledger::types::{VoucherHeader, VoucherSource};

/// Outcome of a registry verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// The number is on file and currently effective.
    Matched,
    /// The registry does not know the number.
    NotFound,
    /// The registration exists but is not yet effective.
    Inactive,
    /// The registration has lapsed.
    Expired,
    /// The registry could not be consulted.
    Failed,
}

impl RegistrationStatus {
    /// Stable key used for persistence.
    #[must_use]
    pub const fn as_key(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::NotFound => "not_found",
            Self::Inactive => "inactive",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }

    /// Parses a persisted status key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "matched" => Some(Self::Matched),
            "not_found" => Some(Self::NotFound),
            "inactive" => Some(Self::Inactive),
            "expired" => Some(Self::Expired),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Result of validating a header's registration number.
///
/// The check never blocks a save by itself; the engine decides what an
/// invalid result means for the calling trust level.
#[derive(Debug, Clone)]
pub struct RegistrationCheck {
    /// Whether the header carries a registration number at all.
    pub has_registration_no: bool,
    /// True when no number is present or the registry confirmed it.
    pub is_valid: bool,
    /// Verification outcome, when a lookup happened.
    pub status: Option<RegistrationStatus>,
    /// Human-readable explanation for non-matched outcomes.
    pub message: Option<String>,
    /// The normalized registration number, when present.
    pub registration_no: Option<String>,
}

impl RegistrationCheck {
    /// The check for a header without a registration number.
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            has_registration_no: false,
            is_valid: true,
            status: None,
            message: None,
            registration_no: None,
        }
    }
}

/// A non-fatal verification failure carried on the save result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationWarning {
    /// The normalized registration number that failed verification.
    pub registration_no: String,
    /// Verification outcome.
    pub status: RegistrationStatus,
    /// Human-readable explanation.
    pub message: String,
}

/// Normalizes a raw registration number.
///
/// Trims, converts full-width alphanumerics to ASCII, uppercases, and drops
/// separator characters.
#[must_use]
pub fn normalize_number(raw: &str) -> String {
    raw.chars()
        .filter_map(|c| match c {
            '０'..='９' | 'Ａ'..='Ｚ' | 'ａ'..='ｚ' => {
                char::from_u32(c as u32 - 0xFEE0).map(|a| a.to_ascii_uppercase())
            }
            '-' | '－' | 'ー' => None,
            c if c.is_whitespace() || c == '　' => None,
            c => Some(c.to_ascii_uppercase()),
        })
        .collect()
}

/// Returns true when the number is `T` followed by exactly 13 digits.
#[must_use]
pub fn is_valid_format(number: &str) -> bool {
    let mut chars = number.chars();
    chars.next() == Some('T')
        && number.len() == 14
        && chars.all(|c| c.is_ascii_digit())
}

/// Normalizes the header's registration number and decides the next step.
///
/// A blank number clears all verification annotations and requires no
/// lookup; a well-formed number is written back normalized and returned for
/// lookup.
///
/// # Errors
///
/// Returns `RegistrationNumberFormat` when the number is present but
/// malformed. This is a syntactic error and fatal for every trust level.
pub fn prepare(header: &mut VoucherHeader) -> Result<Option<String>, LedgerError> {
    let normalized = normalize_number(header.registration_no.as_deref().unwrap_or(""));

    if normalized.is_empty() {
        header.registration_no = None;
        clear_annotations(header);
        return Ok(None);
    }

    if !is_valid_format(&normalized) {
        return Err(LedgerError::RegistrationNumberFormat(normalized));
    }

    header.registration_no = Some(normalized.clone());
    Ok(Some(normalized))
}

/// Interprets a registry lookup and stamps the header annotations.
///
/// Fields the registry did not return are removed from the header rather
/// than left stale.
pub fn apply_lookup(
    header: &mut VoucherHeader,
    number: &str,
    outcome: Result<RegistryRecord, String>,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> RegistrationCheck {
    let (status, message) = match outcome {
        Ok(record) => {
            let status = status_of(&record, today);
            header.registration_checked_at = Some(record.checked_at);
            header.registrant_name = record.name;
            header.registrant_name_kana = record.name_kana;
            header.registration_valid_from = record.valid_from;
            header.registration_valid_to = record.valid_to;
            let message = message_for(status, number, header);
            (status, message)
        }
        Err(error) => {
            clear_annotations(header);
            header.registration_checked_at = Some(now);
            (
                RegistrationStatus::Failed,
                Some(format!(
                    "Could not verify registration number {number}: {error}"
                )),
            )
        }
    };

    header.registration_status = Some(status);

    RegistrationCheck {
        has_registration_no: true,
        is_valid: status == RegistrationStatus::Matched,
        status: Some(status),
        message,
        registration_no: Some(number.to_string()),
    }
}

/// Decides what an invalid verification means for the calling trust level.
///
/// Manual input fails the whole operation; agent and unattended input
/// proceed, carrying the failure forward as a warning.
///
/// # Errors
///
/// Returns `RegistrationInvalid` for manual sources.
pub fn gate_registration(
    source: VoucherSource,
    check: &RegistrationCheck,
) -> Result<Option<RegistrationWarning>, LedgerError> {
    if !check.has_registration_no || check.is_valid {
        return Ok(None);
    }

    let registration_no = check.registration_no.clone().unwrap_or_default();
    let message = check.message.clone().unwrap_or_default();

    match source {
        VoucherSource::Manual => Err(LedgerError::RegistrationInvalid {
            registration_no,
            message,
        }),
        VoucherSource::Agent | VoucherSource::Auto => Ok(Some(RegistrationWarning {
            registration_no,
            status: check.status.unwrap_or(RegistrationStatus::Failed),
            message,
        })),
    }
}

fn clear_annotations(header: &mut VoucherHeader) {
    header.registration_status = None;
    header.registration_checked_at = None;
    header.registrant_name = None;
    header.registrant_name_kana = None;
    header.registration_valid_from = None;
    header.registration_valid_to = None;
}

fn status_of(record: &RegistryRecord, today: NaiveDate) -> RegistrationStatus {
    if !record.found {
        return RegistrationStatus::NotFound;
    }
    if record.valid_from.is_some_and(|from| today < from) {
        return RegistrationStatus::Inactive;
    }
    if record.valid_to.is_some_and(|to| today > to) {
        return RegistrationStatus::Expired;
    }
    RegistrationStatus::Matched
}

fn message_for(
    status: RegistrationStatus,
    number: &str,
    header: &VoucherHeader,
) -> Option<String> {
    match status {
        RegistrationStatus::Matched => None,
        RegistrationStatus::NotFound => Some(format!(
            "Registration number {number} was not found in the invoice registry"
        )),
        RegistrationStatus::Inactive => Some(match header.registration_valid_from {
            Some(from) => {
                format!("Registration number {number} is not yet effective (effective from {from})")
            }
            None => format!("Registration number {number} is not yet effective"),
        }),
        RegistrationStatus::Expired => Some(match header.registration_valid_to {
            Some(to) => format!("Registration number {number} expired on {to}"),
            None => format!("Registration number {number} has expired"),
        }),
        RegistrationStatus::Failed => Some(format!(
            "Could not verify registration number {number}"
        )),
    }
}
