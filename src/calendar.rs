//! Calendar features: southern-hemisphere seasons and localized names

use crate::error::{EtlError, Result};
use chrono::{Datelike, NaiveDate, ParseResult};

/// Parse the `%Y-%m-%d` day at the start of a date field, ignoring any time part
pub fn parse_day(value: &str) -> ParseResult<NaiveDate> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
}

/// Southern-hemisphere astronomical season
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Season {
    Summer,
    Autumn,
    Winter,
    Spring,
}

impl Season {
    /// Season of a date. Each season starts on the 21st of its first month,
    /// so Dec 21, Mar 21, Jun 21 and Sep 21 belong to the season beginning then.
    pub fn for_date(date: NaiveDate) -> Season {
        let day = (date.month(), date.day());
        if day >= (12, 21) || day < (3, 21) {
            Season::Summer
        } else if day < (6, 21) {
            Season::Autumn
        } else if day < (9, 21) {
            Season::Winter
        } else {
            Season::Spring
        }
    }
}

/// Translation of the English calendar names produced by chrono
pub trait CalendarNames: Send + Sync {
    /// Localized month for an English month name
    fn month(&self, english: &str) -> Result<&'static str>;

    /// Localized weekday for an English weekday name
    fn weekday(&self, english: &str) -> Result<&'static str>;

    fn season(&self, season: Season) -> &'static str;
}

/// Brazilian Portuguese names
#[derive(Debug, Clone, Copy, Default)]
pub struct Portuguese;

impl CalendarNames for Portuguese {
    fn month(&self, english: &str) -> Result<&'static str> {
        let name = match english {
            "January" => "Janeiro",
            "February" => "Fevereiro",
            "March" => "Março",
            "April" => "Abril",
            "May" => "Maio",
            "June" => "Junho",
            "July" => "Julho",
            "August" => "Agosto",
            "September" => "Setembro",
            "October" => "Outubro",
            "November" => "Novembro",
            "December" => "Dezembro",
            _ => {
                return Err(EtlError::UnknownCalendarKey {
                    kind: "month",
                    key: english.to_string(),
                })
            }
        };
        Ok(name)
    }

    fn weekday(&self, english: &str) -> Result<&'static str> {
        let name = match english {
            "Sunday" => "Domingo",
            "Monday" => "Segunda-feira",
            "Tuesday" => "Terça-feira",
            "Wednesday" => "Quarta-feira",
            "Thursday" => "Quinta-feira",
            "Friday" => "Sexta-feira",
            "Saturday" => "Sábado",
            _ => {
                return Err(EtlError::UnknownCalendarKey {
                    kind: "weekday",
                    key: english.to_string(),
                })
            }
        };
        Ok(name)
    }

    fn season(&self, season: Season) -> &'static str {
        match season {
            Season::Summer => "Verão",
            Season::Autumn => "Outono",
            Season::Winter => "Inverno",
            Season::Spring => "Primavera",
        }
    }
}

/// Calendar attributes derived from one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFeatures {
    pub year: i32,
    pub month: String,
    pub month_number: u32,
    pub month_localized: &'static str,
    pub weekday: String,
    pub weekday_localized: &'static str,
    /// Monday = 0
    pub weekday_number: u32,
    pub season: &'static str,
}

impl DateFeatures {
    pub fn from_date(date: NaiveDate, names: &dyn CalendarNames) -> Result<Self> {
        let month = date.format("%B").to_string();
        let weekday = date.format("%A").to_string();
        Ok(Self {
            year: date.year(),
            month_localized: names.month(&month)?,
            month,
            month_number: date.month(),
            weekday_localized: names.weekday(&weekday)?,
            weekday,
            weekday_number: date.weekday().num_days_from_monday(),
            season: names.season(Season::for_date(date)),
        })
    }
}
