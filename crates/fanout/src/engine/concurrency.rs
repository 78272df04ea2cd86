use crate::{Error, Result};
use core::{fmt, num::NonZeroUsize};

/// Ceiling used when a caller does not choose one.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Maximum number of per-element actions allowed in flight at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Concurrency(NonZeroUsize);

impl Concurrency {
    /// [`DEFAULT_CONCURRENCY`] as a ceiling.
    pub const DEFAULT: Self = match NonZeroUsize::new(DEFAULT_CONCURRENCY) {
        Some(value) => Self(value),
        None => panic!("DEFAULT_CONCURRENCY must be greater than 0"),
    };

    /// # Errors
    ///
    /// Returns [`Error::InvalidConcurrency`] for a ceiling of zero.
    pub const fn new(value: usize) -> Result<Self> {
        match NonZeroUsize::new(value) {
            Some(value) => Ok(Self(value)),
            None => Err(Error::InvalidConcurrency { value }),
        }
    }

    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<usize> for Concurrency {
    type Error = Error;

    fn try_from(value: usize) -> Result<Self> {
        Self::new(value)
    }
}

impl From<NonZeroUsize> for Concurrency {
    fn from(value: NonZeroUsize) -> Self {
        Self(value)
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_ten() {
        assert_eq!(Concurrency::default(), Concurrency::DEFAULT);
        assert_eq!(Concurrency::default().get(), DEFAULT_CONCURRENCY);
        assert_eq!(Concurrency::default().to_string(), "10");
    }

    #[test]
    fn zero_is_rejected() {
        assert_eq!(
            Concurrency::new(0),
            Err(Error::InvalidConcurrency { value: 0 })
        );
        assert_eq!(Concurrency::try_from(3).map(Concurrency::get), Ok(3));
    }
}
