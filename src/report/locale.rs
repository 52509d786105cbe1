//! Document and figure texts in the supported languages.

use chrono::{Datelike, NaiveDate};

use crate::config::Language;

const UZ_MONTHS: [&str; 12] = [
    "yanvar", "fevral", "mart", "aprel", "may", "iyun", "iyul", "avgust", "sentabr", "oktabr",
    "noyabr", "dekabr",
];

const EN_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    language: Language,
}

impl Locale {
    pub fn new(language: Language) -> Self {
        Locale { language }
    }

    /// `2024-yil 15-yanvar` or `15 January 2024`.
    pub fn format_date(&self, date: NaiveDate) -> String {
        let month = date.month0() as usize;
        match self.language {
            Language::Uz => format!("{}-yil {}-{}", date.year(), date.day(), UZ_MONTHS[month]),
            Language::En => format!("{} {} {}", date.day(), EN_MONTHS[month], date.year()),
        }
    }

    pub fn heading(&self, index: usize, region: &str, date: NaiveDate, gas_name: &str) -> String {
        let date = self.format_date(date);
        match self.language {
            Language::Uz => format!(
                "{index}. Respublika va {region} kesimida {date} holatiga ko‘ra {gas_name} yuqori bo‘lgan hududlar."
            ),
            Language::En => format!(
                "{index}. Areas with elevated {gas_name} across the country and {region} as of {date}."
            ),
        }
    }

    pub fn overview_caption(&self) -> &'static str {
        match self.language {
            Language::Uz => "Respublika kesimida:",
            Language::En => "Country overview:",
        }
    }

    pub fn zoomed_caption(&self, region: &str) -> String {
        match self.language {
            Language::Uz => format!("{region} va unga yondosh hududlar:"),
            Language::En => format!("{region} and neighbouring areas:"),
        }
    }

    pub fn chart_caption(&self, days: u32, gas: &str) -> String {
        match self.language {
            Language::Uz => format!("So‘nggi {days} kun bo‘yicha {gas} o‘rtacha qiymat grafigi:"),
            Language::En => format!("Daily mean {gas} over the last {days} days:"),
        }
    }

    pub fn legend_title(&self, gas: &str, unit: &str) -> String {
        let title = match self.language {
            Language::Uz => format!("{gas} Konsentratsiyasi"),
            Language::En => format!("{gas} concentration"),
        };
        if unit.is_empty() {
            title
        } else {
            format!("{title} ({unit})")
        }
    }

    pub fn chart_title(&self, gas: &str, region: &str, year: i32) -> String {
        format!("{gas} - {region} {year}")
    }

    pub fn chart_y_label(&self, unit: &str) -> String {
        match self.language {
            Language::Uz => format!("O‘rtacha ({unit})"),
            Language::En => format!("Mean ({unit})"),
        }
    }

    pub fn nodata_label(&self) -> &'static str {
        "NoData"
    }
}

// -- Tests -------------------------------------------------------------------
