//! Lifespan countdown.
//!
//! The expected end of life is midnight UTC on the birthday `expected_years`
//! after the birth date (a 29 February birthday clamps to the 28th in common
//! years). Remaining time is split calendar-wise: whole years first, then the
//! leftover days, hours, minutes and seconds.

use std::fmt;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::Serialize;

use crate::error::ValidationError;

pub const MIN_EXPECTED_YEARS: u32 = 1;
pub const MAX_EXPECTED_YEARS: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifespan {
    birth_date: NaiveDate,
    expected_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub expected_end: DateTime<Utc>,
    pub years: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub weeks_remaining: u64,
    /// Share of the expected lifespan already lived, in `[0, 100]`.
    pub percent_lived: f64,
}

impl Countdown {
    pub fn is_over(&self) -> bool {
        self.years == 0 && self.days == 0 && self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}y {}d {:02}h {:02}m {:02}s",
            self.years, self.days, self.hours, self.minutes, self.seconds
        )
    }
}

impl Lifespan {
    pub fn new(birth_date: NaiveDate, expected_years: u32) -> Result<Self, ValidationError> {
        if !(MIN_EXPECTED_YEARS..=MAX_EXPECTED_YEARS).contains(&expected_years) {
            return Err(ValidationError::OutOfRange {
                field: "expectedYears",
                min: MIN_EXPECTED_YEARS as u64,
                max: MAX_EXPECTED_YEARS as u64,
                unit: "years",
                actual: expected_years as u64,
            });
        }
        Ok(Self {
            birth_date,
            expected_years,
        })
    }

    pub fn birth_date(&self) -> NaiveDate {
        self.birth_date
    }

    pub fn expected_years(&self) -> u32 {
        self.expected_years
    }

    fn born_at(&self) -> DateTime<Utc> {
        self.birth_date.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    pub fn expected_end(&self) -> Result<DateTime<Utc>, ValidationError> {
        self.born_at()
            .checked_add_months(Months::new(self.expected_years * 12))
            .ok_or_else(|| ValidationError::invalid("expectedYears", "end date out of range"))
    }

    pub fn countdown(&self) -> Result<Countdown, ValidationError> {
        self.countdown_at(Utc::now())
    }

    pub fn countdown_at(&self, now: DateTime<Utc>) -> Result<Countdown, ValidationError> {
        if self.birth_date > now.date_naive() {
            return Err(ValidationError::invalid(
                "birthDate",
                format!("{} is in the future", self.birth_date),
            ));
        }
        let end = self.expected_end()?;
        let born = self.born_at();

        if now >= end {
            return Ok(Countdown {
                expected_end: end,
                years: 0,
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
                weeks_remaining: 0,
                percent_lived: 100.0,
            });
        }

        let years = whole_years_between(now, end);
        let anchor = now
            .checked_add_months(Months::new(years * 12))
            .unwrap_or(now);
        let rest = end - anchor;

        let lived = (now - born).num_seconds() as f64;
        let total = (end - born).num_seconds() as f64;
        let percent_lived = if total > 0.0 {
            (lived / total * 100.0).clamp(0.0, 100.0)
        } else {
            100.0
        };

        Ok(Countdown {
            expected_end: end,
            years,
            days: rest.num_days() as u32,
            hours: (rest.num_hours() % 24) as u32,
            minutes: (rest.num_minutes() % 60) as u32,
            seconds: (rest.num_seconds() % 60) as u32,
            weeks_remaining: (end - now).num_weeks().max(0) as u64,
            percent_lived,
        })
    }
}

/// Largest `y` with `from + y years <= to`.
fn whole_years_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    let mut years = (to.date_naive().years_since(from.date_naive())).unwrap_or(0) + 1;
    loop {
        if years == 0 {
            return 0;
        }
        match from.checked_add_months(Months::new(years * 12)) {
            Some(t) if t <= to => return years,
            _ => years -= 1,
        }
    }
}
