//! Error codes for the protocol crate.
//!
//! Every failure the API reports maps to exactly one [`ErrorCode`]. The code
//! decides the HTTP status; the message text is for humans only.

use serde::{Deserialize, Serialize};

/// Machine-distinguishable error categories reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed JSON, missing fields or an invalid field value.
    InvalidRequest,
    /// A required path was empty.
    MissingPath,
    /// The path normalizes to a location above the root.
    Traversal,
    /// The path resolves outside the confined root.
    OutsideRoot,
    /// The operation would act on the root directory itself.
    IsRootItself,
    /// Login failed.
    Unauthenticated,
    /// A protected endpoint was called without a valid session.
    Forbidden,
    /// The operating system refused access to the target.
    PermissionDenied,
    /// The target does not exist.
    NotFound,
    /// The target is a directory where a file was expected, or vice versa.
    Conflict,
    /// The upload exceeds the configured size limit.
    PayloadTooLarge,
    /// Any other operating system failure.
    IoFailure,
}

impl ErrorCode {
    /// HTTP status code used when this error is sent to a client.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest | Self::MissingPath | Self::Traversal | Self::Conflict => 400,
            Self::Unauthenticated => 401,
            Self::OutsideRoot | Self::IsRootItself | Self::Forbidden | Self::PermissionDenied => {
                403
            }
            Self::NotFound => 404,
            Self::PayloadTooLarge => 413,
            Self::IoFailure => 500,
        }
    }

    /// Whether the error was caused by the path confinement layer.
    pub fn is_path_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingPath | Self::Traversal | Self::OutsideRoot | Self::IsRootItself
        )
    }
}
