//! Calendar-month periods (UTC) used to window search counts and to compute the
//! month-start trigger of the scheduler.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("Invalid month {}", month);
        }
        Ok(Self { year, month })
    }

    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// First instant of the period, midnight UTC on day one.
    pub fn start(&self) -> DateTime<Utc> {
        // Month is validated on construction, so day one always exists.
        let date = NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default();
        Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
    }

    /// Parses the `YYYY-MM` form produced by `Display`.
    pub fn parse(s: &str) -> Result<Self> {
        let (year, month) = s
            .split_once('-')
            .with_context(|| format!("Invalid period '{}'", s))?;
        let year = year
            .parse()
            .with_context(|| format!("Invalid year in period '{}'", s))?;
        let month = month
            .parse()
            .with_context(|| format!("Invalid month in period '{}'", s))?;
        Self::new(year, month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The first month boundary strictly after `instant`.
pub fn next_month_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    Period::containing(instant).next().start()
}
