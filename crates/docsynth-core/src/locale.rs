//! Locale Rule Registry.
//!
//! Static table of formatting rules keyed by locale code. Lookups are pure;
//! unknown codes resolve to the English rule set and raise a
//! `locale_fallback` event instead of an error.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Locale used when a requested code is unknown.
pub const DEFAULT_LOCALE: &str = "en";

/// Order and separators used when writing calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DateStyle {
    /// `MM/DD/YYYY`
    MonthDayYear,
    /// `DD/MM/YYYY`
    DayMonthYear,
    /// `DD.MM.YYYY`
    DayMonthYearDots,
    /// `DD-MM-YYYY`
    DayMonthYearDashes,
    /// `YYYY-MM-DD`
    YearMonthDay,
    /// `YYYY.MM.DD`
    YearMonthDayDots,
    /// `YYYY/MM/DD`
    YearMonthDaySlashes,
}

impl DateStyle {
    pub fn pattern(self) -> &'static str {
        match self {
            Self::MonthDayYear => "MM/DD/YYYY",
            Self::DayMonthYear => "DD/MM/YYYY",
            Self::DayMonthYearDots => "DD.MM.YYYY",
            Self::DayMonthYearDashes => "DD-MM-YYYY",
            Self::YearMonthDay => "YYYY-MM-DD",
            Self::YearMonthDayDots => "YYYY.MM.DD",
            Self::YearMonthDaySlashes => "YYYY/MM/DD",
        }
    }

    /// Render a date using this style.
    pub fn format(self, date: NaiveDate) -> String {
        let (y, m, d) = (date.year(), date.month(), date.day());
        match self {
            Self::MonthDayYear => format!("{m:02}/{d:02}/{y:04}"),
            Self::DayMonthYear => format!("{d:02}/{m:02}/{y:04}"),
            Self::DayMonthYearDots => format!("{d:02}.{m:02}.{y:04}"),
            Self::DayMonthYearDashes => format!("{d:02}-{m:02}-{y:04}"),
            Self::YearMonthDay => format!("{y:04}-{m:02}-{d:02}"),
            Self::YearMonthDayDots => format!("{y:04}.{m:02}.{d:02}"),
            Self::YearMonthDaySlashes => format!("{y:04}/{m:02}/{d:02}"),
        }
    }
}

/// Order in which personal name parts are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NameStyle {
    GivenFamily,
    FamilyGiven,
    GivenPatronymicFamily,
}

impl NameStyle {
    pub fn describe(self) -> &'static str {
        match self {
            Self::GivenFamily => "given name followed by family name",
            Self::FamilyGiven => "family name followed by given name",
            Self::GivenPatronymicFamily => "given name, patronymic, then family name",
        }
    }
}

/// Formatting rules for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LocaleRules {
    pub locale_code: String,
    /// English name of the language, used in generation prompts.
    pub language_name: String,
    pub date_format_style: DateStyle,
    pub email_domains: BTreeSet<String>,
    /// Legal disclosure reference appropriate for documents in this locale.
    pub legal_reference_text: String,
    pub name_style: NameStyle,
}

/// Observability event raised when an unknown locale code falls back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocaleFallback {
    pub requested: String,
    pub fallback: String,
}

impl fmt::Display for LocaleFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown locale '{}', using '{}' rules",
            self.requested, self.fallback
        )
    }
}

/// Result of a registry lookup, carrying the fallback event when one occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleResolution {
    pub rules: LocaleRules,
    pub fallback: Option<LocaleFallback>,
}

struct LocaleEntry {
    code: &'static str,
    language: &'static str,
    date: DateStyle,
    domains: &'static [&'static str],
    legal: &'static str,
    names: NameStyle,
}

impl LocaleEntry {
    fn to_rules(&self) -> LocaleRules {
        LocaleRules {
            locale_code: self.code.to_string(),
            language_name: self.language.to_string(),
            date_format_style: self.date,
            email_domains: self.domains.iter().map(|d| d.to_string()).collect(),
            legal_reference_text: self.legal.to_string(),
            name_style: self.names,
        }
    }
}

use DateStyle::*;
use NameStyle::*;

const INDIA_DOMAINS: &[&str] = &["gmail.com", "rediffmail.com", "yahoo.co.in"];
const INDIA_LEGAL: &str = "Governed by the Indian Contract Act, 1872.";

#[rustfmt::skip]
const LOCALES: &[LocaleEntry] = &[
    LocaleEntry { code: "en", language: "English", date: MonthDayYear, domains: &["gmail.com", "outlook.com", "yahoo.com"], legal: "Subject to the Uniform Commercial Code and applicable U.S. federal and state law.", names: GivenFamily },
    LocaleEntry { code: "th", language: "Thai", date: DayMonthYear, domains: &["gmail.com", "hotmail.co.th", "outlook.co.th"], legal: "Governed by the Civil and Commercial Code of Thailand.", names: GivenFamily },
    LocaleEntry { code: "es", language: "Spanish", date: DayMonthYear, domains: &["gmail.com", "hotmail.es", "telefonica.net"], legal: "Governed by the Spanish Civil Code (Código Civil) and Commercial Code (Código de Comercio).", names: GivenFamily },
    LocaleEntry { code: "fr", language: "French", date: DayMonthYear, domains: &["gmail.com", "orange.fr", "free.fr", "laposte.net"], legal: "Governed by the French Civil Code (Code civil) and Commercial Code (Code de commerce).", names: GivenFamily },
    LocaleEntry { code: "de", language: "German", date: DayMonthYearDots, domains: &["gmail.com", "web.de", "gmx.de", "t-online.de"], legal: "Governed by the German Civil Code (BGB) and Commercial Code (HGB).", names: GivenFamily },
    LocaleEntry { code: "it", language: "Italian", date: DayMonthYear, domains: &["gmail.com", "libero.it", "virgilio.it"], legal: "Governed by the Italian Civil Code (Codice Civile).", names: GivenFamily },
    LocaleEntry { code: "pt", language: "Portuguese", date: DayMonthYear, domains: &["gmail.com", "sapo.pt", "hotmail.com"], legal: "Governed by the Portuguese Civil Code (Código Civil).", names: GivenFamily },
    LocaleEntry { code: "ru", language: "Russian", date: DayMonthYearDots, domains: &["mail.ru", "yandex.ru", "rambler.ru"], legal: "Governed by the Civil Code of the Russian Federation.", names: GivenPatronymicFamily },
    LocaleEntry { code: "ja", language: "Japanese", date: YearMonthDaySlashes, domains: &["gmail.com", "yahoo.co.jp", "docomo.ne.jp"], legal: "Governed by the Civil Code of Japan (Minpō).", names: FamilyGiven },
    LocaleEntry { code: "ko", language: "Korean", date: YearMonthDayDots, domains: &["naver.com", "daum.net", "gmail.com"], legal: "Governed by the Civil Act of the Republic of Korea.", names: FamilyGiven },
    LocaleEntry { code: "zh", language: "Chinese", date: YearMonthDay, domains: &["qq.com", "163.com", "126.com"], legal: "Governed by the Civil Code of the People's Republic of China.", names: FamilyGiven },
    LocaleEntry { code: "ar", language: "Arabic", date: DayMonthYear, domains: &["gmail.com", "hotmail.com", "yahoo.com"], legal: "Governed by the civil and commercial laws of the issuing jurisdiction.", names: GivenFamily },
    LocaleEntry { code: "hi", language: "Hindi", date: DayMonthYear, domains: INDIA_DOMAINS, legal: INDIA_LEGAL, names: GivenFamily },
    LocaleEntry { code: "nl", language: "Dutch", date: DayMonthYearDashes, domains: &["gmail.com", "ziggo.nl", "kpnmail.nl"], legal: "Governed by the Dutch Civil Code (Burgerlijk Wetboek).", names: GivenFamily },
    LocaleEntry { code: "sv", language: "Swedish", date: YearMonthDay, domains: &["gmail.com", "telia.com", "hotmail.se"], legal: "Governed by the Swedish Contracts Act (Avtalslagen).", names: GivenFamily },
    LocaleEntry { code: "no", language: "Norwegian", date: DayMonthYearDots, domains: &["gmail.com", "online.no", "hotmail.no"], legal: "Governed by the Norwegian Contracts Act (Avtaleloven).", names: GivenFamily },
    LocaleEntry { code: "da", language: "Danish", date: DayMonthYearDots, domains: &["gmail.com", "mail.dk", "hotmail.dk"], legal: "Governed by the Danish Contracts Act (Aftaleloven).", names: GivenFamily },
    LocaleEntry { code: "fi", language: "Finnish", date: DayMonthYearDots, domains: &["gmail.com", "luukku.com", "elisanet.fi"], legal: "Governed by the Finnish Contracts Act (Oikeustoimilaki).", names: GivenFamily },
    LocaleEntry { code: "pl", language: "Polish", date: DayMonthYearDots, domains: &["wp.pl", "onet.pl", "interia.pl"], legal: "Governed by the Polish Civil Code (Kodeks cywilny).", names: GivenFamily },
    LocaleEntry { code: "tr", language: "Turkish", date: DayMonthYearDots, domains: &["gmail.com", "hotmail.com.tr", "yandex.com.tr"], legal: "Governed by the Turkish Code of Obligations (Türk Borçlar Kanunu).", names: GivenFamily },
    LocaleEntry { code: "he", language: "Hebrew", date: DayMonthYear, domains: &["gmail.com", "walla.co.il", "bezeqint.net"], legal: "Governed by the Israeli Contracts (General Part) Law, 5733-1973.", names: GivenFamily },
    LocaleEntry { code: "cs", language: "Czech", date: DayMonthYearDots, domains: &["seznam.cz", "email.cz", "centrum.cz"], legal: "Governed by the Czech Civil Code (Act No. 89/2012 Coll.).", names: GivenFamily },
    LocaleEntry { code: "hu", language: "Hungarian", date: YearMonthDayDots, domains: &["gmail.com", "freemail.hu", "citromail.hu"], legal: "Governed by the Hungarian Civil Code (Act V of 2013).", names: FamilyGiven },
    LocaleEntry { code: "ro", language: "Romanian", date: DayMonthYearDots, domains: &["yahoo.ro", "gmail.com", "rdslink.ro"], legal: "Governed by the Romanian Civil Code (Law No. 287/2009).", names: GivenFamily },
    LocaleEntry { code: "bg", language: "Bulgarian", date: DayMonthYearDots, domains: &["abv.bg", "mail.bg", "gmail.com"], legal: "Governed by the Bulgarian Obligations and Contracts Act.", names: GivenPatronymicFamily },
    LocaleEntry { code: "hr", language: "Croatian", date: DayMonthYearDots, domains: &["gmail.com", "net.hr", "t-com.hr"], legal: "Governed by the Croatian Civil Obligations Act (Zakon o obveznim odnosima).", names: GivenFamily },
    LocaleEntry { code: "sk", language: "Slovak", date: DayMonthYearDots, domains: &["azet.sk", "zoznam.sk", "centrum.sk"], legal: "Governed by the Slovak Civil Code (Act No. 40/1964 Coll.).", names: GivenFamily },
    LocaleEntry { code: "sl", language: "Slovenian", date: DayMonthYearDots, domains: &["gmail.com", "siol.net", "t-2.net"], legal: "Governed by the Slovenian Obligations Code (Obligacijski zakonik).", names: GivenFamily },
    LocaleEntry { code: "et", language: "Estonian", date: DayMonthYearDots, domains: &["gmail.com", "hot.ee", "mail.ee"], legal: "Governed by the Estonian Law of Obligations Act (Võlaõigusseadus).", names: GivenFamily },
    LocaleEntry { code: "lv", language: "Latvian", date: DayMonthYearDots, domains: &["inbox.lv", "gmail.com", "apollo.lv"], legal: "Governed by the Civil Law of the Republic of Latvia (Civillikums).", names: GivenFamily },
    LocaleEntry { code: "lt", language: "Lithuanian", date: YearMonthDay, domains: &["gmail.com", "one.lt", "takas.lt"], legal: "Governed by the Civil Code of the Republic of Lithuania.", names: GivenFamily },
    LocaleEntry { code: "uk", language: "Ukrainian", date: DayMonthYearDots, domains: &["ukr.net", "gmail.com", "i.ua"], legal: "Governed by the Civil Code of Ukraine.", names: GivenPatronymicFamily },
    LocaleEntry { code: "vi", language: "Vietnamese", date: DayMonthYear, domains: &["gmail.com", "yahoo.com.vn", "vnn.vn"], legal: "Governed by the Civil Code of Vietnam (Law No. 91/2015/QH13).", names: FamilyGiven },
    LocaleEntry { code: "id", language: "Indonesian", date: DayMonthYear, domains: &["gmail.com", "yahoo.co.id", "telkom.net"], legal: "Governed by the Indonesian Civil Code (Kitab Undang-Undang Hukum Perdata).", names: GivenFamily },
    LocaleEntry { code: "ms", language: "Malay", date: DayMonthYear, domains: &["gmail.com", "yahoo.com.my", "tm.net.my"], legal: "Governed by the Malaysian Contracts Act 1950.", names: GivenFamily },
    LocaleEntry { code: "tl", language: "Filipino", date: MonthDayYear, domains: &["gmail.com", "yahoo.com.ph", "globe.com.ph"], legal: "Governed by the Civil Code of the Philippines (Republic Act No. 386).", names: GivenFamily },
    LocaleEntry { code: "bn", language: "Bengali", date: DayMonthYear, domains: &["gmail.com", "yahoo.com", "bol-online.com"], legal: "Governed by the Contract Act, 1872 of Bangladesh.", names: GivenFamily },
    LocaleEntry { code: "ta", language: "Tamil", date: DayMonthYear, domains: INDIA_DOMAINS, legal: INDIA_LEGAL, names: GivenFamily },
    LocaleEntry { code: "te", language: "Telugu", date: DayMonthYear, domains: INDIA_DOMAINS, legal: INDIA_LEGAL, names: FamilyGiven },
    LocaleEntry { code: "ml", language: "Malayalam", date: DayMonthYear, domains: INDIA_DOMAINS, legal: INDIA_LEGAL, names: GivenFamily },
    LocaleEntry { code: "kn", language: "Kannada", date: DayMonthYear, domains: INDIA_DOMAINS, legal: INDIA_LEGAL, names: GivenFamily },
    LocaleEntry { code: "gu", language: "Gujarati", date: DayMonthYear, domains: INDIA_DOMAINS, legal: INDIA_LEGAL, names: GivenFamily },
    LocaleEntry { code: "pa", language: "Punjabi", date: DayMonthYear, domains: INDIA_DOMAINS, legal: INDIA_LEGAL, names: GivenFamily },
    LocaleEntry { code: "ur", language: "Urdu", date: DayMonthYear, domains: &["gmail.com", "yahoo.com", "hotmail.com"], legal: "Governed by the Contract Act, 1872 of Pakistan.", names: GivenFamily },
    LocaleEntry { code: "fa", language: "Persian", date: YearMonthDaySlashes, domains: &["gmail.com", "yahoo.com", "chmail.ir"], legal: "Governed by the Civil Code of the Islamic Republic of Iran.", names: GivenFamily },
];

fn find(code: &str) -> Option<&'static LocaleEntry> {
    LOCALES.iter().find(|entry| entry.code == code)
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_lowercase().replace('_', "-")
}

/// Look up rules without emitting any event.
///
/// Codes are matched case-insensitively; a regional suffix (`pt-BR`,
/// `en_US`) falls back to its language code before the default applies.
pub fn lookup(locale_code: &str) -> LocaleResolution {
    let normalized = normalize(locale_code);
    let language = normalized.split('-').next().unwrap_or("");

    if let Some(entry) = find(&normalized).or_else(|| find(language)) {
        return LocaleResolution {
            rules: entry.to_rules(),
            fallback: None,
        };
    }

    LocaleResolution {
        rules: default_rules(),
        fallback: Some(LocaleFallback {
            requested: locale_code.to_string(),
            fallback: DEFAULT_LOCALE.to_string(),
        }),
    }
}

/// Resolve rules for a locale code. Never fails.
pub fn resolve(locale_code: &str) -> LocaleRules {
    let resolution = lookup(locale_code);
    if let Some(fallback) = &resolution.fallback {
        tracing::warn!(
            event = "locale_fallback",
            requested = %fallback.requested,
            fallback = %fallback.fallback,
            "{fallback}"
        );
    }
    resolution.rules
}

/// The English rule set used for unknown codes.
pub fn default_rules() -> LocaleRules {
    LOCALES[0].to_rules()
}

pub fn is_supported(locale_code: &str) -> bool {
    lookup(locale_code).fallback.is_none()
}

/// All supported locale codes in registry order.
pub fn supported_codes() -> impl Iterator<Item = &'static str> {
    LOCALES.iter().map(|entry| entry.code)
}
