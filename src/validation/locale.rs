//! Translations for validation error messages.

use std::str::FromStr;

use super::Rule;
use crate::Error;

/// The language validation messages are written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locale {
    /// Bahasa Indonesia.
    #[default]
    Indonesian,
    /// English.
    English,
}

impl FromStr for Locale {
    type Err = Error;

    /// Parse a language tag such as "id" or "en".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" | "id-id" | "indonesian" => Ok(Locale::Indonesian),
            "en" | "en-us" | "en-gb" | "english" => Ok(Locale::English),
            other => Err(Error::ConfigError(format!("unsupported locale \"{other}\""))),
        }
    }
}

impl Locale {
    /// The message for `label` failing `rule`.
    ///
    /// `other_label` is the label of the field named by [Rule::EqualsField].
    pub fn message(self, rule: &Rule, label: &str, other_label: &str) -> String {
        match self {
            Locale::Indonesian => match rule {
                Rule::Required | Rule::Optional => format!("{label} tidak boleh kosong"),
                Rule::Email => format!("{label} harus berupa email yang valid"),
                Rule::MinLength(length) => format!("{label} minimal {length} karakter"),
                Rule::Numeric => format!("{label} harus berupa angka"),
                Rule::MinValue(min) => format!("{label} minimal {min}"),
                Rule::IsoDate => format!("{label} harus berupa tanggal yang valid"),
                Rule::OneOf(values) => {
                    format!("{label} harus berupa salah satu dari [{}]", values.join(" "))
                }
                Rule::EqualsField(_) => format!("{label} harus sama dengan {other_label}"),
                Rule::UniqueAcrossTable { .. } => format!("{label} sudah digunakan"),
            },
            Locale::English => match rule {
                Rule::Required | Rule::Optional => format!("{label} is a required field"),
                Rule::Email => format!("{label} must be a valid email address"),
                Rule::MinLength(length) => {
                    format!("{label} must be at least {length} characters in length")
                }
                Rule::Numeric => format!("{label} must be a valid numeric value"),
                Rule::MinValue(min) => format!("{label} must be {min} or greater"),
                Rule::IsoDate => format!("{label} must be a valid date"),
                Rule::OneOf(values) => format!("{label} must be one of [{}]", values.join(" ")),
                Rule::EqualsField(_) => format!("{label} must be equal to {other_label}"),
                Rule::UniqueAcrossTable { .. } => format!("{label} is already in use"),
            },
        }
    }
}
