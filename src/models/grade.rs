//! Discrete outcome of one review attempt.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GradeParseError {
    #[error("Unknown grade '{0}', expected again, hard, good or easy")]
    Unknown(String),

    #[error("Invalid rating {0}, expected 1-4")]
    OutOfRange(u8),
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    /// Maps a 1-4 button rating (Again, Hard, Good, Easy) to a grade.
    pub fn from_rating(rating: u8) -> Result<Self, GradeParseError> {
        match rating {
            1 => Ok(Grade::Again),
            2 => Ok(Grade::Hard),
            3 => Ok(Grade::Good),
            4 => Ok(Grade::Easy),
            other => Err(GradeParseError::OutOfRange(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Again => "again",
            Grade::Hard => "hard",
            Grade::Good => "good",
            Grade::Easy => "easy",
        }
    }

    /// Every grade except `Again` counts as a successful recall.
    pub fn is_success(&self) -> bool {
        !matches!(self, Grade::Again)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = GradeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(rating) = trimmed.parse::<u8>() {
            return Self::from_rating(rating);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "again" => Ok(Grade::Again),
            "hard" => Ok(Grade::Hard),
            "good" => Ok(Grade::Good),
            "easy" => Ok(Grade::Easy),
            _ => Err(GradeParseError::Unknown(s.to_string())),
        }
    }
}
