use std::fmt;

use serde::{Deserialize, Serialize};

/// Permission level requested by an inbound registry call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
}

impl Permission {
    /// Classifies an HTTP method.
    ///
    /// `POST`, `PUT` and `DELETE` require [`Permission::Write`]. `GET` and
    /// `HEAD` require [`Permission::Read`]. Any other method (`PATCH`,
    /// `OPTIONS`, extension methods) is classified as [`Permission::Read`],
    /// and a read request can only ever be allowed by a read grant.
    #[must_use]
    pub fn from_method(method: &str) -> Permission {
        match method {
            "POST" | "PUT" | "DELETE" => Permission::Write,
            "GET" | "HEAD" => Permission::Read,
            _ => Permission::Read,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
        }
    }

    /// Returns true if a privilege with the given write flag satisfies this permission.
    /// The check is exact: a write grant does not satisfy a read request.
    #[must_use]
    pub const fn granted_by(self, write: bool) -> bool {
        matches!(
            (self, write),
            (Permission::Write, true) | (Permission::Read, false)
        )
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
