//! Errors for the descry workspace.
//!
//! An error is a classification code plus a message. Wrapping an error in
//! higher-level context keeps its code, so callers can classify a failure
//! (bad parameter vs. bad data vs. IO) without unwinding the chain, and
//! builder-style validation can fold any number of rejected settings into
//! one aggregate report.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};

pub type DescryResult<T> = Result<T, DescryError>;

/// Failure classes surfaced across the workspace.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidConfig,
    InvalidParameter,
    Dataset,
    Engine,
    Io,
    Multiple,
}

impl ErrorCode {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCode::InvalidConfig => "invalid configuration",
            ErrorCode::InvalidParameter => "invalid parameter",
            ErrorCode::Dataset => "dataset",
            ErrorCode::Engine => "engine",
            ErrorCode::Io => "io",
            ErrorCode::Multiple => "multiple",
        }
    }
}

#[derive(Debug)]
pub struct DescryError {
    code: ErrorCode,
    message: Cow<'static, str>,
    source: Option<Box<DescryError>>,
    related: Vec<DescryError>,
}

impl DescryError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<Cow<'static, str>>) -> Self {
        DescryError {
            code,
            message: message.into(),
            source: None,
            related: Vec::new(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Wraps this error in a higher-level message. The code is kept: where
    /// a failure happened does not change what kind of failure it is.
    #[must_use]
    pub fn context(self, message: impl Into<Cow<'static, str>>) -> Self {
        DescryError {
            code: self.code,
            message: message.into(),
            source: Some(Box::new(self)),
            related: Vec::new(),
        }
    }

    /// Folds collected failures into one report. A single error passes
    /// through untouched; several become an [ErrorCode::Multiple] whose
    /// display lists every one.
    pub fn aggregate(mut errors: Vec<DescryError>) -> DescryError {
        match errors.len() {
            0 => DescryError::new(ErrorCode::Engine, "aggregate of zero errors"),
            1 => errors.remove(0),
            n => DescryError {
                code: ErrorCode::Multiple,
                message: format!("{n} errors").into(),
                source: None,
                related: errors,
            },
        }
    }

    /// The individual failures behind an aggregate; empty otherwise.
    pub fn related(&self) -> &[DescryError] {
        &self.related
    }
}

impl Display for DescryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.label(), self.message)?;
        let mut cause = self.source.as_deref();
        while let Some(err) = cause {
            write!(f, ": {}", err.message)?;
            cause = err.source.as_deref();
        }
        for err in &self.related {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DescryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for DescryError {
    fn from(source: std::io::Error) -> Self {
        DescryError::new(ErrorCode::Io, source.to_string())
    }
}

/// Builds a [DescryError] from a code and either a format string or a
/// ready-made message: `descry_err!(Dataset: "row {} is too wide", row)`.
#[macro_export]
macro_rules! descry_err {
    ($code:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::DescryError::new($crate::ErrorCode::$code, format!($fmt $(, $arg)*))
    };
    ($code:ident: $msg:expr $(,)?) => {
        $crate::DescryError::new($crate::ErrorCode::$code, $msg)
    };
}

#[macro_export]
macro_rules! descry_bail {
    ($($tt:tt)+) => { return Err($crate::descry_err!($($tt)+)) };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($tt:tt)+) => {
        if !$cond { $crate::descry_bail!($($tt)+); }
    };
}
