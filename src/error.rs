//! Error types for the host side of the native boundary.
//!
//! Native failures are reported as a status return value plus a thread-local
//! error record. [`crate::bridge`] turns that pair into [`Error::NativeOperation`];
//! every other error variant is raised on the host side before any native call.

use serde::Serialize;
use thiserror::Error;

/// Result alias for operations that cross the native boundary.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by handle proxies, containers and the exception bridge.
#[derive(Debug, Error)]
pub enum Error {
    /// A native constructor or factory reported success but produced no object.
    #[error("native allocation failed for {0}")]
    Allocation(&'static str),

    /// A wrapped native call reported failure.
    #[error(transparent)]
    NativeOperation(#[from] NativeException),

    /// The proxy was used after its handle had been released.
    #[error("{0} has already been disposed")]
    UseAfterDispose(&'static str),

    /// The native container changed shape between the size query and the bulk copy.
    #[error(
        "container row {row} changed size during copy: allocated {expected}, native has {actual}"
    )]
    InconsistentContainerSize {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// The native container gained or lost rows between the size query and the bulk copy.
    #[error("container row count changed during copy: allocated {expected}, native has {actual}")]
    InconsistentContainerRows { expected: usize, actual: usize },

    /// A host value cannot be represented in the native signature.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

impl Error {
    /// Native error code, if this error came from the native side.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Error::NativeOperation(e) => Some(e.code),
            _ => None,
        }
    }
}

/// Error codes reported by the native library (`cv::Error::Code`).
///
/// These values are part of the frozen ABI and must not be renumbered.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    /// Everything is OK
    StsOk = 0,
    /// Pseudo error for back trace
    StsBackTrace = -1,
    /// Unknown / unspecified error
    StsError = -2,
    /// Internal error (bad state)
    StsInternal = -3,
    /// Insufficient memory
    StsNoMem = -4,
    /// Function arg/param is bad
    StsBadArg = -5,
    /// Unsupported function
    StsBadFunc = -6,
    /// Iteration didn't converge
    StsNoConv = -7,
    /// Tracing
    StsAutoTrace = -8,
    /// Null pointer
    StsNullPtr = -27,
    /// Incorrect vector length
    StsVecLengthErr = -28,
    /// The input/output structure size is incorrect
    StsBadSize = -201,
    /// Division by zero
    StsDivByZero = -202,
    /// In-place operation is not supported
    StsInplaceNotSupported = -203,
    /// Request can't be completed
    StsObjectNotFound = -204,
    /// Formats of input/output arrays differ
    StsUnmatchedFormats = -205,
    /// Flag is wrong or not supported
    StsBadFlag = -206,
    /// Bad point
    StsBadPoint = -207,
    /// Bad format of mask
    StsBadMask = -208,
    /// Sizes of input/output structures do not match
    StsUnmatchedSizes = -209,
    /// The data format/type is not supported by the function
    StsUnsupportedFormat = -210,
    /// Some of parameters are out of range
    StsOutOfRange = -211,
    /// Invalid syntax/structure of the parsed file
    StsParseError = -212,
    /// The requested function/feature is not implemented
    StsNotImplemented = -213,
    /// An allocated block has been corrupted
    StsBadMemBlock = -214,
    /// Assertion failed
    StsAssert = -215,
}

impl ErrorCode {
    /// Map a raw native code to a known variant.
    pub fn from_raw(code: i32) -> Option<Self> {
        use ErrorCode::*;

        let known = match code {
            0 => StsOk,
            -1 => StsBackTrace,
            -2 => StsError,
            -3 => StsInternal,
            -4 => StsNoMem,
            -5 => StsBadArg,
            -6 => StsBadFunc,
            -7 => StsNoConv,
            -8 => StsAutoTrace,
            -27 => StsNullPtr,
            -28 => StsVecLengthErr,
            -201 => StsBadSize,
            -202 => StsDivByZero,
            -203 => StsInplaceNotSupported,
            -204 => StsObjectNotFound,
            -205 => StsUnmatchedFormats,
            -206 => StsBadFlag,
            -207 => StsBadPoint,
            -208 => StsBadMask,
            -209 => StsUnmatchedSizes,
            -210 => StsUnsupportedFormat,
            -211 => StsOutOfRange,
            -212 => StsParseError,
            -213 => StsNotImplemented,
            -214 => StsBadMemBlock,
            -215 => StsAssert,
            _ => return None,
        };
        Some(known)
    }

    /// Human-readable description, as printed by the native library.
    pub fn description(self) -> &'static str {
        use ErrorCode::*;

        match self {
            StsOk => "No Error",
            StsBackTrace => "Backtrace",
            StsError => "Unspecified error",
            StsInternal => "Internal error",
            StsNoMem => "Insufficient memory",
            StsBadArg => "Bad argument",
            StsBadFunc => "Unsupported function",
            StsNoConv => "Iterations do not converge",
            StsAutoTrace => "Autotrace call",
            StsNullPtr => "Null pointer",
            StsVecLengthErr => "Incorrect size of input array",
            StsBadSize => "Incorrect size of input array",
            StsDivByZero => "Division by zero occurred",
            StsInplaceNotSupported => "Inplace operation is not supported",
            StsObjectNotFound => "Requested object was not found",
            StsUnmatchedFormats => "Formats of input arguments do not match",
            StsBadFlag => "Bad flag (parameter or structure field)",
            StsBadPoint => "Bad parameter of type CvPoint",
            StsBadMask => "Bad type of mask argument",
            StsUnmatchedSizes => "Sizes of input arguments do not match",
            StsUnsupportedFormat => "Unsupported format or combination of formats",
            StsOutOfRange => "One of the arguments' values is out of range",
            StsParseError => "Parsing error",
            StsNotImplemented => "The function/feature is not implemented",
            StsBadMemBlock => "Memory block has been corrupted",
            StsAssert => "Assertion failed",
        }
    }
}

/// A failure reported by the native library.
///
/// The raw `code` is kept as-is so codes unknown to [`ErrorCode`] survive the
/// translation unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("({code}:{}) {message} in function '{func}' at {file}:{line}", describe_code(.code))]
pub struct NativeException {
    /// Raw native error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Native function that raised the error
    pub func: String,
    /// Native source file
    pub file: String,
    /// Native source line
    pub line: i32,
}

impl NativeException {
    /// Known error code, or `None` for codes outside `cv::Error::Code`.
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_raw(self.code)
    }

    /// Exception reported when the native side signalled failure without an error record.
    pub(crate) fn unknown() -> Self {
        Self {
            code: ErrorCode::StsError as i32,
            message: "unknown native exception".to_string(),
            func: String::new(),
            file: String::new(),
            line: 0,
        }
    }
}

fn describe_code(code: &i32) -> &'static str {
    ErrorCode::from_raw(*code).map_or("Unknown error code", ErrorCode::description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_raw() {
        assert_eq!(ErrorCode::from_raw(-215), Some(ErrorCode::StsAssert));
        assert_eq!(ErrorCode::from_raw(-211), Some(ErrorCode::StsOutOfRange));
        assert_eq!(ErrorCode::from_raw(-9999), None);
    }

    #[test]
    fn test_native_exception_display() {
        let e = NativeException {
            code: -215,
            message: "value > 0".to_string(),
            func: "setNumOfAngleLine".to_string(),
            file: "radial_variance_hash.cpp".to_string(),
            line: 42,
        };
        let text = e.to_string();
        assert!(text.contains("-215:Assertion failed"));
        assert!(text.contains("value > 0"));
        assert!(text.contains("'setNumOfAngleLine'"));

        let err = Error::from(e);
        assert_eq!(err.native_code(), Some(-215));
    }

    #[test]
    fn test_unknown_code_survives() {
        let e = NativeException {
            code: 12345,
            message: "custom".to_string(),
            func: String::new(),
            file: String::new(),
            line: 0,
        };
        assert_eq!(e.kind(), None);
        assert!(e.to_string().contains("12345:Unknown error code"));
    }

    #[test]
    fn test_native_exception_serializes() {
        let json = serde_json::to_string(&NativeException::unknown()).unwrap();
        assert!(json.contains("\"code\":-2"));
        assert!(json.contains("unknown native exception"));
    }

    #[test]
    fn test_shape_errors_display_counts() {
        let rows = Error::InconsistentContainerRows {
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            rows.to_string(),
            "container row count changed during copy: allocated 1, native has 2"
        );
        assert_eq!(rows.native_code(), None);
    }

    #[test]
    fn test_host_errors_have_no_native_code() {
        assert_eq!(Error::UseAfterDispose("Vector").native_code(), None);
        assert_eq!(Error::Allocation("Vector").native_code(), None);
    }
}
