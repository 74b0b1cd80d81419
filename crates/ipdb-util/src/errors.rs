use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all ipdb operations.
#[derive(Debug, Error, Diagnostic)]
pub enum IpdbError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed IP list (e.g. ips_list.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check the IP list for syntax errors"))]
    Manifest { message: String },

    /// A nested manifest could not be retrieved or parsed.
    #[error("Failed to fetch dependencies of ip '{package}': {message}")]
    #[diagnostic(help("No partial dependency tree is kept; fix the package source and retry"))]
    Fetch { package: String, message: String },

    /// A package lists one of its own ancestors as a dependency.
    #[error("Cyclic dependency: {chain}")]
    CyclicDependency { chain: String },

    /// Global configuration could not be loaded.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Database cache could not be read or written.
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Interactive prompt failed.
    #[error("Prompt error: {message}")]
    Prompt { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type IpdbResult<T> = miette::Result<T>;
