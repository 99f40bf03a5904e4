//! Viewer locale handling
//!
//! A [`LocaleTag`] is the viewer's language/region preference. It is only
//! used to pick date-formatting conventions: the month names come from
//! chrono's locale tables, the field order from [`LocaleTag::long_date_pattern`].

use crate::error::{Error, Result};
use chrono::Locale;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Environment variables consulted, in order, for the host locale.
const HOST_LOCALE_VARS: [&str; 3] = ["LC_ALL", "LC_TIME", "LANG"];

/// Language/region tag such as `en-US` or `de`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct LocaleTag {
    language: String,
    region: Option<String>,
}

impl LocaleTag {
    /// Parse a tag in BCP-47 (`en-US`) or POSIX (`en_US.UTF-8`) form.
    ///
    /// Script subtags (`zh-Hant-TW`) are skipped, codeset and modifier
    /// suffixes (`.UTF-8`, `@euro`) are dropped.
    pub fn new(tag: &str) -> Result<Self> {
        let base = tag
            .trim()
            .split(|c| c == '.' || c == '@')
            .next()
            .unwrap_or_default();
        let mut subtags = base.split(|c| c == '-' || c == '_').filter(|s| !s.is_empty());

        let language = subtags
            .next()
            .filter(|s| (2..=3).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphabetic()))
            .ok_or_else(|| Error::InvalidLocale(tag.to_string()))?
            .to_ascii_lowercase();

        let region = subtags
            .find(|s| {
                (s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()))
                    || (s.len() == 3 && s.chars().all(|c| c.is_ascii_digit()))
            })
            .map(|s| s.to_ascii_uppercase());

        Ok(Self { language, region })
    }

    /// Detect the host locale from `LC_ALL`, `LC_TIME` or `LANG`.
    ///
    /// Returns `None` when none is set or only the `C`/`POSIX` locale is.
    pub fn from_env() -> Option<Self> {
        HOST_LOCALE_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .filter(|value| !is_posix_default(value))
            .find_map(|value| Self::new(&value).ok())
    }

    /// Lowercase language subtag, e.g. `en`.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Uppercase region subtag, e.g. `US`.
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// The chrono locale whose month names are used for this tag.
    ///
    /// Falls back to the language's primary region, then to `en_US`.
    pub fn chrono_locale(&self) -> Locale {
        if let Some(region) = &self.region {
            if let Ok(locale) = Locale::try_from(format!("{}_{}", self.language, region).as_str()) {
                return locale;
            }
        }

        match primary_locale(&self.language).and_then(|name| Locale::try_from(name).ok()) {
            Some(locale) => locale,
            None => {
                tracing::debug!(locale = %self, "No date conventions for locale, using en_US");
                Locale::en_US
            }
        }
    }

    /// strftime pattern for the long calendar date (numeric year, long month,
    /// numeric day) in this locale's field order.
    ///
    /// chrono only carries nominative month names. Finnish takes the
    /// partitive, which is the nominative plus `ta` for every month; other
    /// languages that inflect the month in dates (Czech, Polish, Russian, ...)
    /// render the nominative.
    pub fn long_date_pattern(&self) -> &'static str {
        match (self.language.as_str(), self.region.as_deref()) {
            ("en", None | Some("US" | "CA" | "PH")) => "%B %-d, %Y",
            ("en", _) => "%-d %B %Y",
            ("de" | "da" | "nb" | "no" | "cs" | "sk", _) => "%-d. %B %Y",
            ("es" | "pt", _) => "%-d de %B de %Y",
            ("ja" | "zh", _) => "%Y年%-m月%-d日",
            ("ko", _) => "%Y년 %-m월 %-d일",
            ("fi", _) => "%-d. %Bta %Y",
            ("hu", _) => "%Y. %B %-d.",
            _ => "%-d %B %Y",
        }
    }
}

impl Default for LocaleTag {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            region: Some("US".to_string()),
        }
    }
}

impl fmt::Display for LocaleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}-{}", self.language, region),
            None => write!(f, "{}", self.language),
        }
    }
}

impl FromStr for LocaleTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for LocaleTag {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

fn is_posix_default(value: &str) -> bool {
    value.is_empty() || value == "C" || value == "POSIX" || value.starts_with("C.")
}

fn primary_locale(language: &str) -> Option<&'static str> {
    let name = match language {
        "en" => "en_US",
        "de" => "de_DE",
        "fr" => "fr_FR",
        "es" => "es_ES",
        "it" => "it_IT",
        "pt" => "pt_BR",
        "nl" => "nl_NL",
        "sv" => "sv_SE",
        "da" => "da_DK",
        "nb" | "no" => "nb_NO",
        "fi" => "fi_FI",
        "pl" => "pl_PL",
        "cs" => "cs_CZ",
        "sk" => "sk_SK",
        "hu" => "hu_HU",
        "ru" => "ru_RU",
        "uk" => "uk_UA",
        "tr" => "tr_TR",
        "ja" => "ja_JP",
        "zh" => "zh_CN",
        "ko" => "ko_KR",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bcp47_tag() {
        let tag = LocaleTag::new("en-US").unwrap();
        assert_eq!(tag.language(), "en");
        assert_eq!(tag.region(), Some("US"));
        assert_eq!(tag.to_string(), "en-US");
    }

    #[test]
    fn test_parse_posix_tag() {
        let tag = LocaleTag::new("de_DE.UTF-8").unwrap();
        assert_eq!(tag.to_string(), "de-DE");

        let tag = LocaleTag::new("fr_FR@euro").unwrap();
        assert_eq!(tag.to_string(), "fr-FR");
    }

    #[test]
    fn test_parse_normalizes_case_and_skips_script() {
        let tag = LocaleTag::new("ZH-hant-tw").unwrap();
        assert_eq!(tag.to_string(), "zh-TW");

        let tag = LocaleTag::new("es-419").unwrap();
        assert_eq!(tag.region(), Some("419"));
    }

    #[test]
    fn test_language_only_tag() {
        let tag: LocaleTag = "de".parse().unwrap();
        assert_eq!(tag.region(), None);
        assert_eq!(tag.chrono_locale(), Locale::de_DE);
    }

    #[test]
    fn test_invalid_tags() {
        assert!(LocaleTag::new("").is_err());
        assert!(LocaleTag::new("   ").is_err());
        assert!(LocaleTag::new("english").is_err());
        assert!(LocaleTag::new("1-US").is_err());
    }

    #[test]
    fn test_chrono_locale_fallbacks() {
        assert_eq!(LocaleTag::new("en-GB").unwrap().chrono_locale(), Locale::en_GB);
        // Unknown region falls back to the language's primary locale
        assert_eq!(LocaleTag::new("fr-ZZ").unwrap().chrono_locale(), Locale::fr_FR);
        // Unknown language falls back to en_US
        assert_eq!(LocaleTag::new("xx").unwrap().chrono_locale(), Locale::en_US);
    }

    #[test]
    fn test_long_date_patterns() {
        assert_eq!(LocaleTag::default().long_date_pattern(), "%B %-d, %Y");
        assert_eq!(LocaleTag::new("en-GB").unwrap().long_date_pattern(), "%-d %B %Y");
        assert_eq!(LocaleTag::new("de-AT").unwrap().long_date_pattern(), "%-d. %B %Y");
        assert_eq!(LocaleTag::new("fi-FI").unwrap().long_date_pattern(), "%-d. %Bta %Y");
    }

    #[test]
    fn test_posix_default_is_ignored() {
        assert!(is_posix_default("C"));
        assert!(is_posix_default("C.UTF-8"));
        assert!(is_posix_default("POSIX"));
        assert!(!is_posix_default("en_US.UTF-8"));
    }

    #[test]
    fn test_deserialize_from_string() {
        #[derive(Deserialize)]
        struct Wrapper {
            locale: LocaleTag,
        }

        let parsed: Wrapper = toml::from_str(r#"locale = "pt_BR""#).unwrap();
        assert_eq!(parsed.locale.to_string(), "pt-BR");
        assert!(toml::from_str::<Wrapper>(r#"locale = """#).is_err());
    }
}
