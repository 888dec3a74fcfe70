use std::fmt;
use std::num::NonZero;

/// One producer/consumer layout that an MPMC benchmark is executed with.
///
/// Both counts are at least one; a layout without producers or without consumers cannot be
/// expressed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MpmcPair {
    producers: NonZero<usize>,
    consumers: NonZero<usize>,
}

impl MpmcPair {
    /// Creates a layout with the given number of producer and consumer threads.
    #[must_use]
    pub const fn new(producers: NonZero<usize>, consumers: NonZero<usize>) -> Self {
        Self {
            producers,
            consumers,
        }
    }

    /// Number of producer threads.
    #[must_use]
    pub fn producers(&self) -> NonZero<usize> {
        self.producers
    }

    /// Number of consumer threads.
    #[must_use]
    pub fn consumers(&self) -> NonZero<usize> {
        self.consumers
    }

    /// Total number of worker threads in the layout.
    #[must_use]
    pub fn total(&self) -> NonZero<usize> {
        self.producers.saturating_add(self.consumers.get())
    }
}

impl Default for MpmcPair {
    fn default() -> Self {
        Self::new(NonZero::<usize>::MIN, NonZero::<usize>::MIN)
    }
}

impl fmt::Display for MpmcPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "producers={} consumers={}",
            self.producers, self.consumers
        )
    }
}
