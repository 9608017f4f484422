//! Lookback period tokens understood by the quote provider (`5d`, `6mo`, `2y`, ...).

use super::provider::DataError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How far back from today to fetch history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LookbackPeriod {
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
    YearToDate,
    Max,
}

impl Default for LookbackPeriod {
    fn default() -> Self {
        LookbackPeriod::Years(2)
    }
}

impl FromStr for LookbackPeriod {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        match token.as_str() {
            "ytd" => return Ok(LookbackPeriod::YearToDate),
            "max" => return Ok(LookbackPeriod::Max),
            _ => {}
        }

        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| DataError::InvalidPeriod(s.to_string()))?;
        let (count, unit) = token.split_at(split);
        let count: u32 = count
            .parse()
            .map_err(|_| DataError::InvalidPeriod(s.to_string()))?;
        if count == 0 {
            return Err(DataError::InvalidPeriod(s.to_string()));
        }

        match unit {
            "d" => Ok(LookbackPeriod::Days(count)),
            "wk" => Ok(LookbackPeriod::Weeks(count)),
            "mo" => Ok(LookbackPeriod::Months(count)),
            "y" => Ok(LookbackPeriod::Years(count)),
            _ => Err(DataError::InvalidPeriod(s.to_string())),
        }
    }
}

impl fmt::Display for LookbackPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookbackPeriod::Days(n) => write!(f, "{n}d"),
            LookbackPeriod::Weeks(n) => write!(f, "{n}wk"),
            LookbackPeriod::Months(n) => write!(f, "{n}mo"),
            LookbackPeriod::Years(n) => write!(f, "{n}y"),
            LookbackPeriod::YearToDate => f.write_str("ytd"),
            LookbackPeriod::Max => f.write_str("max"),
        }
    }
}

impl TryFrom<String> for LookbackPeriod {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LookbackPeriod> for String {
    fn from(value: LookbackPeriod) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_tokens() {
        assert_eq!("2y".parse::<LookbackPeriod>().unwrap(), LookbackPeriod::Years(2));
        assert_eq!("6mo".parse::<LookbackPeriod>().unwrap(), LookbackPeriod::Months(6));
        assert_eq!("5d".parse::<LookbackPeriod>().unwrap(), LookbackPeriod::Days(5));
        assert_eq!("3wk".parse::<LookbackPeriod>().unwrap(), LookbackPeriod::Weeks(3));
        assert_eq!("YTD".parse::<LookbackPeriod>().unwrap(), LookbackPeriod::YearToDate);
        assert_eq!("max".parse::<LookbackPeriod>().unwrap(), LookbackPeriod::Max);
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["", "y", "0y", "2", "2years", "-1d", "1.5y"] {
            assert!(bad.parse::<LookbackPeriod>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn display_matches_token() {
        assert_eq!(LookbackPeriod::Months(18).to_string(), "18mo");
        assert_eq!(LookbackPeriod::default().to_string(), "2y");
    }
}
