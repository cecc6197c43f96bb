use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::resolver::{AccessRequest, Decision, authorize};
use crate::server::AppState;
use crate::server::errors::RegistryError;
use crate::store::AccessStore;
use crate::types::Permission;

const PING_MARKER: &str = "_ping";
const IMAGE_RESOURCE: &str = "images";

/// What an inbound path asks to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target<'a> {
    /// Liveness and version checks, which never need credentials.
    Liveness,
    Repository {
        namespace: &'a str,
        repository: &'a str,
        image_resource: bool,
    },
}

/// Extracts the namespace and repository a request path refers to.
///
/// `/v1/<resource>/<namespace>/<repository>/...` and
/// `/v2/<namespace>/<repository>/...`. Missing segments come back empty,
/// which never matches a user or organization.
#[must_use]
pub fn classify_path(path: &str) -> Target<'_> {
    if path.split('/').any(|segment| segment == PING_MARKER) {
        return Target::Liveness;
    }

    if path == "/v2" || path == "/v2/" {
        return Target::Liveness;
    }

    let image_resource = path.split('/').any(|segment| segment == IMAGE_RESOURCE);

    let (namespace, repository) = if let Some(rest) = path.strip_prefix("/v1/") {
        let mut segments = rest.split('/').skip(1);
        (segments.next(), segments.next())
    } else if let Some(rest) = path.strip_prefix("/v2/") {
        let mut segments = rest.split('/');
        (segments.next(), segments.next())
    } else {
        (None, None)
    };

    Target::Repository {
        namespace: namespace.unwrap_or_default(),
        repository: repository.unwrap_or_default(),
        image_resource,
    }
}

/// Decides a request from its method, path and `Authorization` header.
/// `None` means the path needs no authorization.
pub fn check_request(
    store: &dyn AccessStore,
    method: &str,
    path: &str,
    authorization: Option<&str>,
) -> Option<Decision> {
    let Target::Repository {
        namespace,
        repository,
        image_resource,
    } = classify_path(path)
    else {
        return None;
    };

    let request = AccessRequest {
        authorization,
        namespace,
        repository,
        permission: Permission::from_method(method),
        image_resource,
    };

    Some(authorize(store, &request))
}

/// Middleware that runs ahead of every registry handler.
///
/// Denied requests get a not-found response so repository existence is not
/// revealed to callers without access.
pub async fn require_access(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let decision = check_request(
        state.store.as_ref(),
        request.method().as_str(),
        request.uri().path(),
        authorization,
    );

    match decision {
        None => next.run(request).await,
        Some(Decision::Allow(grant)) => {
            tracing::debug!(
                "Access granted for {} {}: {grant:?}",
                request.method(),
                request.uri().path()
            );
            request.extensions_mut().insert(grant);
            next.run(request).await
        }
        Some(Decision::Deny(denial)) => {
            tracing::debug!(
                "Access denied for {} {}: {denial}",
                request.method(),
                request.uri().path()
            );
            RegistryError::unauthorized().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_is_liveness() {
        assert_eq!(classify_path("/_ping"), Target::Liveness);
        assert_eq!(classify_path("/v1/_ping"), Target::Liveness);
        assert_eq!(classify_path("/v2/"), Target::Liveness);
        assert_eq!(classify_path("/v2"), Target::Liveness);
    }

    #[test]
    fn test_ping_inside_a_name_is_not_liveness() {
        assert_eq!(
            classify_path("/v2/alice/x_ping/manifests/evil"),
            Target::Repository {
                namespace: "alice",
                repository: "x_ping",
                image_resource: false,
            }
        );
        assert_eq!(
            classify_path("/v2/_pingers/app/tags/list"),
            Target::Repository {
                namespace: "_pingers",
                repository: "app",
                image_resource: false,
            }
        );
    }

    #[test]
    fn test_v1_uses_second_and_third_segments() {
        assert_eq!(
            classify_path("/v1/repositories/acme/app/tags"),
            Target::Repository {
                namespace: "acme",
                repository: "app",
                image_resource: false,
            }
        );
    }

    #[test]
    fn test_v2_uses_first_and_second_segments() {
        assert_eq!(
            classify_path("/v2/acme/app/manifests/latest"),
            Target::Repository {
                namespace: "acme",
                repository: "app",
                image_resource: false,
            }
        );
    }

    #[test]
    fn test_image_resource_detection() {
        assert_eq!(
            classify_path("/v1/images/abc123/json"),
            Target::Repository {
                namespace: "abc123",
                repository: "json",
                image_resource: true,
            }
        );
        assert_eq!(
            classify_path("/v2/acme/myimages/tags/list"),
            Target::Repository {
                namespace: "acme",
                repository: "myimages",
                image_resource: false,
            }
        );
    }

    #[test]
    fn test_missing_segments_are_empty() {
        assert_eq!(
            classify_path("/v1/repositories"),
            Target::Repository {
                namespace: "",
                repository: "",
                image_resource: false,
            }
        );
        assert_eq!(
            classify_path("/other/path"),
            Target::Repository {
                namespace: "",
                repository: "",
                image_resource: false,
            }
        );
    }
}
