use crate::error::ProcessorError;
use std::{fmt, str::FromStr};

/// A 9 digit friend code as shown in game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FriendCode(u32);

impl FriendCode {
    pub fn parse(code: &str) -> Result<Self, ProcessorError> {
        if code.len() != 9 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProcessorError::InvalidInput(format!("Friend code {} is not valid", code)));
        }

        code.parse::<u32>()
            .map(FriendCode)
            .map_err(|_| ProcessorError::InvalidInput(format!("Friend code {} is not valid", code)))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl FromStr for FriendCode {
    type Err = ProcessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FriendCode::parse(s)
    }
}

/// Renders as `123 456 789`
impl fmt::Display for FriendCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = format!("{:09}", self.0);
        write!(f, "{} {} {}", &digits[..3], &digits[3..6], &digits[6..])
    }
}
