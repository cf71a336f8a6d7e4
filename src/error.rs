use std::{fmt, result};

/// Crate wide Result type, pinned to [Error].
pub type Result<T> = result::Result<T, Error>;

/// Crate wide error type, every variant carries the `file!():line!()` location
/// where the error was raised followed by a human readable message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// record id negative or >= count.
    InvalidId(String, String),
    /// vector length does not match the dataset's configured dimension.
    VectorSizeMismatch(String, String),
    /// tag is empty after trim+lowercase normalization.
    EmptyTag(String, String),
    /// group id is zero, negative or unknown.
    InvalidGroupId(String, String),
    /// a member with the requested `place` already exists in the group.
    PlaceTaken(String, String),
    /// (id, tag) pair already present in TagIndex.
    DuplicatedTag(String, String),
    /// (id, tag) pair absent from TagIndex.
    TagNotFound(String, String),
    /// a Writer offset is less than -1.
    InvalidOffset(String, String),
    /// an Index id is out of the [0, count) range.
    IndexOutOfRange(String, String),
    /// dataset directory/config exists with a different configuration.
    DatasetExistsDifferentConfig(String, String),
    /// dataset directory or config file does not exist.
    DatasetNotFound(String, String),
    /// operation requires tags but the dataset was opened without them.
    TagsNotEnabled(String, String),
    /// caller supplied vector slot did not match the store's next slot.
    IndexIntegrity(String, String),
    /// fs::metadata() failed before a File/BlobHeap/Index/VectorStore could init.
    FileStat(String, String),
    /// a read returned fewer bytes than requested.
    FileRead(String, String),
    /// any other propagated std::io::Error.
    IOError(String, String),
    /// numeric or string conversion failed.
    FailConvert(String, String),
    /// cbordata encode/decode failed.
    FailCbor(String, String),
    /// should-be-unreachable state, or an invariant violated at runtime.
    Fatal(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;

        match self {
            InvalidId(p, m) => write!(f, "{} InvalidId: {}", p, m),
            VectorSizeMismatch(p, m) => write!(f, "{} VectorSizeMismatch: {}", p, m),
            EmptyTag(p, m) => write!(f, "{} EmptyTag: {}", p, m),
            InvalidGroupId(p, m) => write!(f, "{} InvalidGroupId: {}", p, m),
            PlaceTaken(p, m) => write!(f, "{} PlaceTaken: {}", p, m),
            DuplicatedTag(p, m) => write!(f, "{} DuplicatedTag: {}", p, m),
            TagNotFound(p, m) => write!(f, "{} TagNotFound: {}", p, m),
            InvalidOffset(p, m) => write!(f, "{} InvalidOffset: {}", p, m),
            IndexOutOfRange(p, m) => write!(f, "{} IndexOutOfRange: {}", p, m),
            DatasetExistsDifferentConfig(p, m) => {
                write!(f, "{} DatasetExistsDifferentConfig: {}", p, m)
            }
            DatasetNotFound(p, m) => write!(f, "{} DatasetNotFound: {}", p, m),
            TagsNotEnabled(p, m) => write!(f, "{} TagsNotEnabled: {}", p, m),
            IndexIntegrity(p, m) => write!(f, "{} IndexIntegrity: {}", p, m),
            FileStat(p, m) => write!(f, "{} FileStat: {}", p, m),
            FileRead(p, m) => write!(f, "{} FileRead: {}", p, m),
            IOError(p, m) => write!(f, "{} IOError: {}", p, m),
            FailConvert(p, m) => write!(f, "{} FailConvert: {}", p, m),
            FailCbor(p, m) => write!(f, "{} FailCbor: {}", p, m),
            Fatal(p, m) => write!(f, "{} Fatal: {}", p, m),
        }
    }
}

impl std::error::Error for Error {}

/// Build an [Error] value, stamping the call site, in the flavors used across
/// this crate:
///
/// * `err_at!(Variant, msg: "fmt", args...)` — construct directly from a message.
/// * `err_at!(Variant, fallible_expr)` — map `Err(e)` of `fallible_expr` to
///   `Error::Variant`, carrying `e.to_string()` as the message. `Ok(v)` passes
///   through unchanged.
/// * `err_at!(Variant, fallible_expr, "fmt", args...)` — same, with an extra
///   context message prepended to the underlying error.
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err($crate::Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err($crate::Error::$v(prefix, err.to_string()))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err($crate::Error::$v(prefix, format!("{} : {}", msg, err)))
            }
        }
    }};
}
