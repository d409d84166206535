use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroU32,
    ops::Mul,
};

use crate::{Count, MonoisotopicMass};

impl Count {
    #[must_use]
    pub fn new(n: u32) -> Option<Self> {
        NonZeroU32::new(n).map(Self)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    pub(crate) fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.get()).map(Self)
    }

    pub(crate) fn checked_mul(self, rhs: Self) -> Option<Self> {
        self.0.checked_mul(rhs.0).map(Self)
    }

    // NOTE: Returns `None` when the count is already `u32::MAX`
    pub(crate) fn increment(self) -> Option<Self> {
        self.checked_add(Self::default())
    }

    // NOTE: Returns `None` when the last atom is removed, since there is no such thing as a zero `Count`
    pub(crate) fn decrement(self) -> Option<Self> {
        Self::new(self.get() - 1)
    }
}

impl Mul<MonoisotopicMass> for Count {
    type Output = MonoisotopicMass;

    fn mul(self, rhs: MonoisotopicMass) -> Self::Output {
        MonoisotopicMass(f64::from(self.get()) * rhs.0)
    }
}

impl From<Count> for u32 {
    fn from(value: Count) -> Self {
        value.get()
    }
}

impl Display for Count {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let count = self.get();
        if count > 1 {
            write!(f, "{count}")?;
        }
        Ok(())
    }
}

impl Default for Count {
    fn default() -> Self {
        Self(NonZeroU32::MIN)
    }
}
