use std::fmt;

/// The value that marks a parameter tuple component as unused in the configuration language.
pub const UNUSED_PARAM: i64 = -1;

/// Up to three integer parameters that a benchmark body can read from its
/// [`Context`][crate::Context].
///
/// A benchmark is executed once for every parameter tuple in its settings. Components that are
/// not used are `None`; in the configuration language they are written as `-1`.
///
/// # Examples
///
/// ```
/// use sweep_bench::ParamTuple;
///
/// let tuple = ParamTuple::pair(1024, 8);
/// assert_eq!(tuple.x(), Some(1024));
/// assert_eq!(tuple.z(), None);
/// assert_eq!(tuple.to_string(), "(1024,8)");
///
/// assert_eq!(ParamTuple::from_raw([7, -1, -1]), ParamTuple::single(7));
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ParamTuple {
    x: Option<i64>,
    y: Option<i64>,
    z: Option<i64>,
}

impl ParamTuple {
    /// A tuple with no used components.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            x: None,
            y: None,
            z: None,
        }
    }

    /// A tuple with only the first component used.
    #[must_use]
    pub const fn single(x: i64) -> Self {
        Self {
            x: Some(x),
            y: None,
            z: None,
        }
    }

    /// A tuple with the first two components used.
    #[must_use]
    pub const fn pair(x: i64, y: i64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: None,
        }
    }

    /// A tuple with all three components used.
    #[must_use]
    pub const fn triple(x: i64, y: i64, z: i64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// Creates a tuple from its configuration form, where [`UNUSED_PARAM`] marks unused
    /// components.
    #[must_use]
    pub fn from_raw(raw: [i64; 3]) -> Self {
        let [x, y, z] = raw.map(|value| (value != UNUSED_PARAM).then_some(value));
        Self { x, y, z }
    }

    /// Returns the configuration form of the tuple, with [`UNUSED_PARAM`] for unused components.
    #[must_use]
    pub fn to_raw(&self) -> [i64; 3] {
        [self.x, self.y, self.z].map(|value| value.unwrap_or(UNUSED_PARAM))
    }

    /// The first component.
    #[must_use]
    pub fn x(&self) -> Option<i64> {
        self.x
    }

    /// The second component.
    #[must_use]
    pub fn y(&self) -> Option<i64> {
        self.y
    }

    /// The third component.
    #[must_use]
    pub fn z(&self) -> Option<i64> {
        self.z
    }

    /// Whether no component is used.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none()
    }
}

impl fmt::Display for ParamTuple {
    /// Renders the used components as `(x,y,z)`; a tuple without used components renders as an
    /// empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return Ok(());
        }

        write!(f, "(")?;

        let mut first = true;
        for value in [self.x, self.y, self.z].into_iter().flatten() {
            if !first {
                write!(f, ",")?;
            }

            write!(f, "{value}")?;
            first = false;
        }

        write!(f, ")")
    }
}
