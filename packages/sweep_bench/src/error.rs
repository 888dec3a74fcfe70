use std::io;

use thiserror::Error;

/// Errors that can occur when configuring, registering or launching benchmarks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A benchmark can only be launched once. The `launched` flag is terminal.
    #[error("benchmark '{benchmark}' has already been launched")]
    AlreadyLaunched {
        /// Name of the benchmark that was launched a second time.
        benchmark: String,
    },

    /// A registry can only contain one benchmark with any given name.
    #[error("a benchmark named '{name}' is already registered")]
    DuplicateBenchmark {
        /// The name that was registered twice.
        name: String,
    },

    /// A worker thread of a sweep point panicked while executing user code.
    ///
    /// All other workers of the same sweep point were still allowed to complete before this
    /// error was raised.
    #[error("{role} worker of benchmark '{benchmark}' panicked: {message}")]
    WorkerPanicked {
        /// Name of the benchmark whose worker panicked.
        benchmark: String,

        /// The role of the worker, e.g. `producer-1` or `thread-0`.
        role: String,

        /// The panic message, if the payload carried one.
        message: String,
    },

    /// The operating system refused to start a worker thread.
    #[error("failed to spawn {role} worker thread for benchmark '{benchmark}'")]
    SpawnFailed {
        /// Name of the benchmark whose worker could not be started.
        benchmark: String,

        /// The role of the worker that could not be started.
        role: String,

        /// The underlying error from the thread builder.
        #[source]
        source: io::Error,
    },

    /// The sweep settings were syntactically valid but described an impossible configuration.
    #[error("invalid sweep settings: {problem}")]
    InvalidSettings {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// The sweep settings could not be parsed as TOML.
    #[error("sweep settings are not valid TOML")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn invalid_settings(problem: impl Into<String>) -> Self {
        Self::InvalidSettings {
            problem: problem.into(),
        }
    }
}

/// A specialized `Result` type for benchmark harness operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
