use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Lang {
    #[serde(rename = "auto")]
    #[default]
    Auto,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh-CN")]
    ChineseSimplified,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "ru")]
    Russian,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "pt")]
    Portuguese,
}

impl Lang {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::English => "en",
            Self::ChineseSimplified => "zh-CN",
            Self::Japanese => "ja",
            Self::Korean => "ko",
            Self::French => "fr",
            Self::German => "de",
            Self::Spanish => "es",
            Self::Russian => "ru",
            Self::Italian => "it",
            Self::Portuguese => "pt",
        }
    }

    /// Best-effort script guess. Latin text is reported as English.
    pub fn guess(text: &str) -> Option<Self> {
        let mut kana = 0usize;
        let mut hangul = 0usize;
        let mut han = 0usize;
        let mut cyrillic = 0usize;
        let mut latin = 0usize;

        for ch in text.chars() {
            match ch as u32 {
                0x3040..=0x30FF => kana += 1,
                0xAC00..=0xD7AF | 0x1100..=0x11FF => hangul += 1,
                0x4E00..=0x9FFF | 0x3400..=0x4DBF => han += 1,
                0x0400..=0x04FF => cyrillic += 1,
                _ if ch.is_ascii_alphabetic() => latin += 1,
                _ => {}
            }
        }

        if kana > 0 {
            Some(Self::Japanese)
        } else if hangul > 0 {
            Some(Self::Korean)
        } else if han > 0 {
            Some(Self::ChineseSimplified)
        } else if cyrillic > latin {
            Some(Self::Russian)
        } else if latin > 0 {
            Some(Self::English)
        } else {
            None
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
