use std::io;
use thiserror::Error;

// ========================================================================= //

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

// ========================================================================= //

/// An error from an installer database operation.
///
/// Every variant carries a human-readable description; use `kind()` to match
/// on the category and `code()` to get the numeric Windows result code.
#[derive(Debug, Error)]
pub enum Error {
    /// An allocation could not be satisfied.
    #[error("{0}")]
    NotEnoughMemory(String),
    /// A file could not be opened, or had the wrong class identifier.
    #[error("{0}")]
    OpenFailed(String),
    /// A write was attempted on a read-only database.
    #[error("{0}")]
    AccessDenied(String),
    /// A generic internal failure, such as malformed binary structure.
    #[error("{0}")]
    FunctionFailed(String),
    /// An argument was out of range or otherwise invalid.
    #[error("{0}")]
    InvalidParameter(String),
    /// An object was used in the wrong state.
    #[error("{0}")]
    InvalidHandle(String),
    /// A table does not exist.
    #[error("{0}")]
    InvalidTable(String),
    /// Two table schemas are incompatible.
    #[error("{0}")]
    DatatypeMismatch(String),
    /// A query could not be built.
    #[error("{0}")]
    BadQuerySyntax(String),
    /// A named item (string, stream, storage) does not exist.
    #[error("{0}")]
    NotFound(String),
    /// There are no more rows to fetch.
    #[error("{0}")]
    NoMoreItems(String),
    /// A caller-supplied buffer is too small.
    #[error("{0}")]
    MoreData(String),
    /// An underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The category of an `Error`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// See `Error::NotEnoughMemory`.
    NotEnoughMemory,
    /// See `Error::OpenFailed`.
    OpenFailed,
    /// See `Error::AccessDenied`.
    AccessDenied,
    /// See `Error::FunctionFailed`.  I/O errors also have this kind.
    FunctionFailed,
    /// See `Error::InvalidParameter`.
    InvalidParameter,
    /// See `Error::InvalidHandle`.
    InvalidHandle,
    /// See `Error::InvalidTable`.
    InvalidTable,
    /// See `Error::DatatypeMismatch`.
    DatatypeMismatch,
    /// See `Error::BadQuerySyntax`.
    BadQuerySyntax,
    /// See `Error::NotFound`.
    NotFound,
    /// See `Error::NoMoreItems`.
    NoMoreItems,
    /// See `Error::MoreData`.
    MoreData,
}

impl Error {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match *self {
            Error::NotEnoughMemory(_) => ErrorKind::NotEnoughMemory,
            Error::OpenFailed(_) => ErrorKind::OpenFailed,
            Error::AccessDenied(_) => ErrorKind::AccessDenied,
            Error::FunctionFailed(_) | Error::Io(_) => {
                ErrorKind::FunctionFailed
            }
            Error::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Error::InvalidHandle(_) => ErrorKind::InvalidHandle,
            Error::InvalidTable(_) => ErrorKind::InvalidTable,
            Error::DatatypeMismatch(_) => ErrorKind::DatatypeMismatch,
            Error::BadQuerySyntax(_) => ErrorKind::BadQuerySyntax,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::NoMoreItems(_) => ErrorKind::NoMoreItems,
            Error::MoreData(_) => ErrorKind::MoreData,
        }
    }

    /// Returns the numeric Windows result code for this error.
    pub fn code(&self) -> u32 {
        self.kind().code()
    }

    pub(crate) fn is_no_more_items(&self) -> bool {
        self.kind() == ErrorKind::NoMoreItems
    }

    pub(crate) fn is_not_found(&self) -> bool {
        match *self {
            Error::NotFound(_) => true,
            Error::Io(ref error) => error.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl ErrorKind {
    /// Returns the numeric Windows result code for this kind of error.
    pub fn code(self) -> u32 {
        match self {
            ErrorKind::AccessDenied => 5,
            ErrorKind::InvalidHandle => 6,
            ErrorKind::NotEnoughMemory => 8,
            ErrorKind::InvalidParameter => 87,
            ErrorKind::OpenFailed => 110,
            ErrorKind::MoreData => 234,
            ErrorKind::NoMoreItems => 259,
            ErrorKind::NotFound => 1168,
            ErrorKind::BadQuerySyntax => 1615,
            ErrorKind::FunctionFailed => 1627,
            ErrorKind::InvalidTable => 1628,
            ErrorKind::DatatypeMismatch => 1629,
        }
    }
}

// ========================================================================= //


// ========================================================================= //
