use std::num::NonZero;
use std::str::FromStr;
use std::time::Duration;

use toml::{Table, Value};

use crate::{Error, MpmcPair, ParamTuple, Result, SweepSettingsBuilder, UNUSED_PARAM};

/// The iteration budget that does not limit the measured loop.
pub const UNBOUNDED_ITERATIONS: i64 = -1;

/// Remaining work allowed for one measured loop.
///
/// The loop keeps going while either dimension is positive. A dimension that starts at zero or
/// below does not limit anything.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Budget {
    pub(crate) iterations: i64,
    pub(crate) nanoseconds: i64,
}

/// Immutable description of the configuration space that a benchmark sweeps.
///
/// A benchmark launch executes `attempts` repetitions of every combination of MPMC pair
/// (MPMC benchmarks only) and parameter tuple. Each execution runs the measured body until both
/// the iteration budget and the time budget are used up.
///
/// Use [`SweepSettings::builder()`] to create an instance in code or
/// [`SweepSettings::from_toml_str()`] to load one from configuration.
///
/// # Examples
///
/// ```
/// use std::num::NonZero;
/// use std::time::Duration;
///
/// use sweep_bench::{MpmcPair, ParamTuple, SweepSettings};
///
/// let one = NonZero::new(1).unwrap();
/// let four = NonZero::new(4).unwrap();
///
/// let settings = SweepSettings::builder()
///     .attempts(NonZero::new(3).unwrap())
///     .iterations(10_000)
///     .param(ParamTuple::single(64))
///     .param(ParamTuple::single(4096))
///     .mpmc_pair(MpmcPair::new(one, one))
///     .mpmc_pair(MpmcPair::new(four, one))
///     .build();
///
/// assert_eq!(settings.attempts().get(), 3);
/// assert_eq!(settings.time_budget(), Duration::ZERO);
/// assert_eq!(settings.params().len(), 2);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SweepSettings {
    attempts: NonZero<u32>,
    iterations: i64,
    time_budget: Duration,
    params: Vec<ParamTuple>,
    mpmc_pairs: Vec<MpmcPair>,
    threads: NonZero<usize>,
}

impl SweepSettings {
    pub(crate) fn new(
        attempts: NonZero<u32>,
        iterations: i64,
        time_budget: Duration,
        params: Vec<ParamTuple>,
        mpmc_pairs: Vec<MpmcPair>,
        threads: NonZero<usize>,
    ) -> Self {
        Self {
            attempts,
            iterations,
            time_budget,
            params,
            mpmc_pairs,
            threads,
        }
    }

    /// Starts building a new set of sweep settings.
    pub fn builder() -> SweepSettingsBuilder {
        SweepSettingsBuilder::default()
    }

    /// Parses sweep settings from a TOML document.
    ///
    /// ```toml
    /// attempts = 3
    /// iterations = 1000          # -1 = unbounded
    /// time_budget_ms = 250       # 0 = unbounded
    /// params = [[100], [200, 2], [1, 2, 3]]
    /// mpmc = [[1, 1], [2, 4]]    # (producers, consumers)
    /// threads = 4
    /// ```
    ///
    /// All keys are optional and follow the same defaults as [`SweepSettings::builder()`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Toml`] if the document is not valid TOML and [`Error::InvalidSettings`]
    /// if it contains unknown keys, values of the wrong type or values out of range.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let table: Table = toml::from_str(document)?;

        let mut builder = Self::builder();

        for (key, value) in &table {
            builder = match key.as_str() {
                "attempts" => builder.attempts(non_zero_u32(key, value)?),
                "iterations" => builder.iterations(integer(key, value)?),
                "time_budget_ms" => {
                    let millis = u64::try_from(integer(key, value)?).ok().ok_or_else(|| {
                        Error::invalid_settings("'time_budget_ms' must not be negative")
                    })?;
                    builder.time_budget(Duration::from_millis(millis))
                }
                "params" => builder.params(
                    array(key, value)?
                        .iter()
                        .map(param_tuple)
                        .collect::<Result<Vec<_>>>()?,
                ),
                "mpmc" => builder.mpmc_pairs(
                    array(key, value)?
                        .iter()
                        .map(mpmc_pair)
                        .collect::<Result<Vec<_>>>()?,
                ),
                "threads" => builder.threads(non_zero_usize(key, value)?),
                other => {
                    return Err(Error::invalid_settings(format!("unknown key '{other}'")));
                }
            };
        }

        Ok(builder.build())
    }

    /// Number of times every sweep point is executed.
    #[must_use]
    pub fn attempts(&self) -> NonZero<u32> {
        self.attempts
    }

    /// Iteration budget of every measured loop. Zero or negative does not limit the loop.
    #[must_use]
    pub fn iterations(&self) -> i64 {
        self.iterations
    }

    /// Time budget of every measured loop. Zero does not limit the loop.
    #[must_use]
    pub fn time_budget(&self) -> Duration {
        self.time_budget
    }

    /// Parameter tuples to sweep, in order. May be empty before normalization.
    #[must_use]
    pub fn params(&self) -> &[ParamTuple] {
        &self.params
    }

    /// Producer/consumer layouts to sweep, in order. May be empty before normalization.
    #[must_use]
    pub fn mpmc_pairs(&self) -> &[MpmcPair] {
        &self.mpmc_pairs
    }

    /// Number of worker threads used by symmetric multithreaded benchmarks.
    #[must_use]
    pub fn threads(&self) -> NonZero<usize> {
        self.threads
    }

    /// Returns a copy where every sweep dimension has at least one entry.
    ///
    /// An empty list of MPMC pairs becomes a single pair of one producer and one consumer; an
    /// empty list of parameter tuples becomes a single tuple without used components. This
    /// guarantees that every benchmark executes at least once per attempt. Normalizing
    /// normalized settings changes nothing.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();

        if normalized.mpmc_pairs.is_empty() {
            normalized.mpmc_pairs.push(MpmcPair::default());
        }

        if normalized.params.is_empty() {
            normalized.params.push(ParamTuple::none());
        }

        normalized
    }

    pub(crate) fn budget(&self) -> Budget {
        Budget {
            iterations: self.iterations,
            nanoseconds: i64::try_from(self.time_budget.as_nanos()).unwrap_or(i64::MAX),
        }
    }
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FromStr for SweepSettings {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_toml_str(s)
    }
}

fn integer(key: &str, value: &Value) -> Result<i64> {
    value
        .as_integer()
        .ok_or_else(|| Error::invalid_settings(format!("'{key}' must be an integer")))
}

fn positive<T>(key: &str, value: &Value) -> Result<T>
where
    T: TryFrom<i64>,
{
    T::try_from(integer(key, value)?)
        .ok()
        .ok_or_else(|| Error::invalid_settings(format!("'{key}' must be a positive integer")))
}

fn non_zero_u32(key: &str, value: &Value) -> Result<NonZero<u32>> {
    NonZero::new(positive(key, value)?)
        .ok_or_else(|| Error::invalid_settings(format!("'{key}' must be a positive integer")))
}

fn non_zero_usize(key: &str, value: &Value) -> Result<NonZero<usize>> {
    NonZero::new(positive(key, value)?)
        .ok_or_else(|| Error::invalid_settings(format!("'{key}' must be a positive integer")))
}

fn array<'a>(key: &str, value: &'a Value) -> Result<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| Error::invalid_settings(format!("'{key}' must be an array")))
}

fn param_tuple(value: &Value) -> Result<ParamTuple> {
    let components = array("params", value)?;

    if components.is_empty() || components.len() > 3 {
        return Err(Error::invalid_settings(
            "every entry of 'params' must have between one and three integers",
        ));
    }

    let mut raw = [UNUSED_PARAM; 3];
    for (slot, component) in raw.iter_mut().zip(components) {
        *slot = integer("params", component)?;
    }

    Ok(ParamTuple::from_raw(raw))
}

fn mpmc_pair(value: &Value) -> Result<MpmcPair> {
    let [producers, consumers] = array("mpmc", value)? else {
        return Err(Error::invalid_settings(
            "every entry of 'mpmc' must be a [producers, consumers] pair",
        ));
    };

    Ok(MpmcPair::new(
        non_zero_usize("mpmc", producers)?,
        non_zero_usize("mpmc", consumers)?,
    ))
}
