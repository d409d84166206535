use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroU32,
};

use crate::MassNumber;

impl MassNumber {
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl Display for MassNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NonZeroU32> for MassNumber {
    fn from(value: NonZeroU32) -> Self {
        Self(value)
    }
}
