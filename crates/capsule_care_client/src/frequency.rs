//! Prescribed frequency codes and the number of doses each implies per day.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Doses per day assumed when a medication has no usable frequency.
pub const DEFAULT_DOSES_PER_DAY: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyCode {
    OnceDaily,
    TwiceDaily,
    ThreeTimesDaily,
    FourTimesDaily,
    #[serde(rename = "every_4_hours")]
    Every4Hours,
    #[serde(rename = "every_6_hours")]
    Every6Hours,
    #[serde(rename = "every_8_hours")]
    Every8Hours,
    #[serde(rename = "every_12_hours")]
    Every12Hours,
    EveryOtherDay,
    TwiceWeekly,
    OnceWeekly,
    AsNeeded,
}

impl FrequencyCode {
    pub const ALL: [FrequencyCode; 12] = [
        Self::OnceDaily,
        Self::TwiceDaily,
        Self::ThreeTimesDaily,
        Self::FourTimesDaily,
        Self::Every4Hours,
        Self::Every6Hours,
        Self::Every8Hours,
        Self::Every12Hours,
        Self::EveryOtherDay,
        Self::TwiceWeekly,
        Self::OnceWeekly,
        Self::AsNeeded,
    ];

    /// Fractional for schedules sparser than daily; zero for `as_needed`.
    pub fn doses_per_day(&self) -> f64 {
        match self {
            Self::OnceDaily => 1.0,
            Self::TwiceDaily => 2.0,
            Self::ThreeTimesDaily => 3.0,
            Self::FourTimesDaily => 4.0,
            Self::Every4Hours => 6.0,
            Self::Every6Hours => 4.0,
            Self::Every8Hours => 3.0,
            Self::Every12Hours => 2.0,
            Self::EveryOtherDay => 0.5,
            Self::TwiceWeekly => 2.0 / 7.0,
            Self::OnceWeekly => 1.0 / 7.0,
            Self::AsNeeded => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnceDaily => "once_daily",
            Self::TwiceDaily => "twice_daily",
            Self::ThreeTimesDaily => "three_times_daily",
            Self::FourTimesDaily => "four_times_daily",
            Self::Every4Hours => "every_4_hours",
            Self::Every6Hours => "every_6_hours",
            Self::Every8Hours => "every_8_hours",
            Self::Every12Hours => "every_12_hours",
            Self::EveryOtherDay => "every_other_day",
            Self::TwiceWeekly => "twice_weekly",
            Self::OnceWeekly => "once_weekly",
            Self::AsNeeded => "as_needed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown frequency code: {0}")]
pub struct UnknownFrequency(pub String);

impl FromStr for FrequencyCode {
    type Err = UnknownFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == canonical)
            .ok_or_else(|| UnknownFrequency(s.to_string()))
    }
}

impl fmt::Display for FrequencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected doses per day for a raw `prescribed_frequency` value.
/// Missing or unrecognised codes count as one dose a day.
pub fn expected_doses_per_day(code: Option<&str>) -> f64 {
    code.and_then(|c| c.parse::<FrequencyCode>().ok())
        .map(|c| c.doses_per_day())
        .unwrap_or(DEFAULT_DOSES_PER_DAY)
}
