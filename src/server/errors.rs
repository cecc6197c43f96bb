//! Registry error vocabulary.
//!
//! Codes, values and messages are wire constants shared with existing
//! registry clients and must not change.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::manifest::MigrateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    pub code: u16,
    #[serde(skip)]
    pub value: &'static str,
    pub message: &'static str,
    #[serde(skip)]
    pub description: &'static str,
}

pub const UNKNOWN: ErrorDescriptor = ErrorDescriptor {
    code: 0,
    value: "UNKNOWN",
    message: "unknown error",
    description: "Generic error returned when the error does not have an API classification.",
};

pub const UNAUTHORIZED: ErrorDescriptor = ErrorDescriptor {
    code: 1,
    value: "UNAUTHORIZED",
    message: "access to the requested resource is not authorized",
    description: "The access controller denied access for the operation on a resource. \
                  Often this will be accompanied by a 401 Unauthorized response status.",
};

pub const DIGEST_INVALID: ErrorDescriptor = ErrorDescriptor {
    code: 2,
    value: "DIGEST_INVALID",
    message: "provided digest did not match uploaded content",
    description: "When a blob is uploaded, the registry will check that the content matches \
                  the digest provided by the client. The error may include a detail structure \
                  with the key \"digest\", including the invalid digest string. This error may \
                  also be returned when a manifest includes an invalid layer digest.",
};

pub const SIZE_INVALID: ErrorDescriptor = ErrorDescriptor {
    code: 3,
    value: "SIZE_INVALID",
    message: "provided length did not match content length",
    description: "When a layer is uploaded, the provided size will be checked against the \
                  uploaded content. If they do not match, this error will be returned.",
};

pub const NAME_INVALID: ErrorDescriptor = ErrorDescriptor {
    code: 4,
    value: "NAME_INVALID",
    message: "manifest name did not match URI",
    description: "During a manifest upload, if the name in the manifest does not match the \
                  uri name, this error will be returned.",
};

pub const TAG_INVALID: ErrorDescriptor = ErrorDescriptor {
    code: 5,
    value: "TAG_INVALID",
    message: "manifest tag did not match URI",
    description: "During a manifest upload, if the tag in the manifest does not match the uri \
                  tag, this error will be returned.",
};

pub const NAME_UNKNOWN: ErrorDescriptor = ErrorDescriptor {
    code: 6,
    value: "NAME_UNKNOWN",
    message: "repository name not known to registry",
    description: "This is returned if the name used during an operation is unknown to the \
                  registry.",
};

pub const MANIFEST_UNKNOWN: ErrorDescriptor = ErrorDescriptor {
    code: 7,
    value: "MANIFEST_UNKNOWN",
    message: "manifest unknown",
    description: "This error is returned when the manifest, identified by name and tag is \
                  unknown to the repository.",
};

pub const MANIFEST_INVALID: ErrorDescriptor = ErrorDescriptor {
    code: 8,
    value: "MANIFEST_INVALID",
    message: "manifest invalid",
    description: "During upload, manifests undergo several checks ensuring validity. If those \
                  checks fail, this error may be returned, unless a more specific error is \
                  included. The detail will contain information the failed validation.",
};

pub const MANIFEST_UNVERIFIED: ErrorDescriptor = ErrorDescriptor {
    code: 9,
    value: "MANIFEST_UNVERIFIED",
    message: "manifest failed signature verification",
    description: "During manifest upload, if the manifest fails signature verification, this \
                  error will be returned.",
};

pub const BLOB_UNKNOWN: ErrorDescriptor = ErrorDescriptor {
    code: 10,
    value: "BLOB_UNKNOWN",
    message: "blob unknown to registry",
    description: "This error may be returned when a blob is unknown to the registry in a \
                  specified repository. This can be returned with a standard get or if a \
                  manifest references an unknown layer during upload.",
};

pub const BLOB_UPLOAD_UNKNOWN: ErrorDescriptor = ErrorDescriptor {
    code: 11,
    value: "BLOB_UPLOAD_UNKNOWN",
    message: "blob upload unknown to registry",
    description: "If a blob upload has been cancelled or was never started, this error code \
                  may be returned.",
};

#[derive(Debug, Serialize)]
struct ErrorBody {
    errors: Vec<ErrorDescriptor>,
}

/// Error response in the registry's `{"errors": [...]}` format.
#[derive(Debug)]
pub struct RegistryError {
    pub status: StatusCode,
    pub descriptor: ErrorDescriptor,
}

impl RegistryError {
    #[must_use]
    pub const fn new(status: StatusCode, descriptor: ErrorDescriptor) -> Self {
        Self { status, descriptor }
    }

    /// Denied access. Reported as not found so callers cannot probe for
    /// repositories they have no access to.
    #[must_use]
    pub const fn unauthorized() -> Self {
        Self::new(StatusCode::NOT_FOUND, UNAUTHORIZED)
    }

    #[must_use]
    pub const fn bad_request(descriptor: ErrorDescriptor) -> Self {
        Self::new(StatusCode::BAD_REQUEST, descriptor)
    }

    #[must_use]
    pub const fn not_found(descriptor: ErrorDescriptor) -> Self {
        Self::new(StatusCode::NOT_FOUND, descriptor)
    }

    #[must_use]
    pub const fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, UNKNOWN)
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            errors: vec![self.descriptor],
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<MigrateError> for RegistryError {
    fn from(err: MigrateError) -> Self {
        match err {
            MigrateError::ManifestDecodeFailed(_)
            | MigrateError::ManifestInvalid(_)
            | MigrateError::LayerDecodeFailed { .. } => Self::bad_request(MANIFEST_INVALID),
            MigrateError::DigestInvalid { .. } => Self::bad_request(DIGEST_INVALID),
            MigrateError::StoreWriteFailed(e) => {
                tracing::error!("Manifest migration failed in store: {e}");
                Self::internal()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTORS: [ErrorDescriptor; 12] = [
        UNKNOWN,
        UNAUTHORIZED,
        DIGEST_INVALID,
        SIZE_INVALID,
        NAME_INVALID,
        TAG_INVALID,
        NAME_UNKNOWN,
        MANIFEST_UNKNOWN,
        MANIFEST_INVALID,
        MANIFEST_UNVERIFIED,
        BLOB_UNKNOWN,
        BLOB_UPLOAD_UNKNOWN,
    ];

    #[test]
    fn test_codes_match_table_position() {
        for (index, descriptor) in DESCRIPTORS.iter().enumerate() {
            assert_eq!(descriptor.code as usize, index, "{}", descriptor.value);
        }
    }

    #[test]
    fn test_serializes_code_and_message_only() {
        let body = serde_json::to_value(ErrorBody {
            errors: vec![UNAUTHORIZED],
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "errors": [{
                    "code": 1,
                    "message": "access to the requested resource is not authorized"
                }]
            })
        );
    }

    #[test]
    fn test_unauthorized_is_not_found() {
        let response = RegistryError::unauthorized().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
