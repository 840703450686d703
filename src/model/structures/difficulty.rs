use serde_repr::{Deserialize_repr, Serialize_repr};
use std::{convert::TryFrom, fmt};
use strum_macros::EnumIter;

/// Chart difficulty tier. The integer values match the remote API's
/// `difficulty` query parameter.
#[derive(Deserialize_repr, Serialize_repr, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter)]
#[repr(u8)]
pub enum Difficulty {
    Past = 0,
    Present = 1,
    Future = 2,
    Beyond = 3,
    Eternal = 4
}

impl Difficulty {
    pub fn short_name(&self) -> &'static str {
        match self {
            Difficulty::Past => "PST",
            Difficulty::Present => "PRS",
            Difficulty::Future => "FTR",
            Difficulty::Beyond => "BYD",
            Difficulty::Eternal => "ETR"
        }
    }
}

impl TryFrom<i32> for Difficulty {
    type Error = ();

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Difficulty::Past),
            1 => Ok(Difficulty::Present),
            2 => Ok(Difficulty::Future),
            3 => Ok(Difficulty::Beyond),
            4 => Ok(Difficulty::Eternal),
            _ => Err(())
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
