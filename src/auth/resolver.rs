//! Repository authorization.
//!
//! [`authorize`] walks a fixed sequence of checks and stops at the first one
//! that decides:
//!
//! 1. the `Authorization` header must be present and use the `Basic` scheme;
//! 2. the header must decode and the credentials must resolve to a user;
//! 3. legacy image sub-resources are not namespace scoped and are allowed;
//! 4. a user always owns the namespace named after them;
//! 5. any other namespace must be an existing organization;
//! 6. a repository that does not exist yet is open to organization owners only;
//! 7. otherwise the first team privilege on the repository decides.
//!
//! Every failed lookup is a deny.

use super::credentials::{decode_basic_auth, is_basic_scheme, resolve_user};
use crate::store::AccessStore;
use crate::types::{Permission, Repository, User};

/// Everything the resolver needs to know about an inbound request.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub authorization: Option<&'a str>,
    pub namespace: &'a str,
    pub repository: &'a str,
    pub permission: Permission,
    pub image_resource: bool,
}

/// Why a request was allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    ImageResource,
    NamespaceOwner,
    OrganizationOwner,
    TeamPrivilege { team_id: String, privilege_id: String },
}

/// Why a request was denied. Never exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    AuthHeaderMissing,
    CredentialDecodeFailed,
    UserUnknown,
    OrganizationUnknown,
    RepositoryLookupFailed,
    NotOrganizationOwner,
    TeamLookupFailed,
    PrivilegeLookupFailed,
    PrivilegeMismatch,
    NoMatchingPrivilege,
}

impl Denial {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Denial::AuthHeaderMissing => "authorization header missing or not basic",
            Denial::CredentialDecodeFailed => "credentials could not be decoded",
            Denial::UserUnknown => "credentials do not match a user",
            Denial::OrganizationUnknown => "namespace is not an organization",
            Denial::RepositoryLookupFailed => "repository lookup failed",
            Denial::NotOrganizationOwner => "repository does not exist and user is not an owner",
            Denial::TeamLookupFailed => "team lookup failed",
            Denial::PrivilegeLookupFailed => "privilege lookup failed",
            Denial::PrivilegeMismatch => "team privilege does not grant the requested permission",
            Denial::NoMatchingPrivilege => "no team privilege on repository",
        }
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(Grant),
    Deny(Denial),
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}

/// Decides whether the request may proceed.
pub fn authorize(store: &dyn AccessStore, request: &AccessRequest<'_>) -> Decision {
    let header = match request.authorization {
        Some(header) if is_basic_scheme(header) => header,
        _ => return Decision::Deny(Denial::AuthHeaderMissing),
    };

    let Ok(credentials) = decode_basic_auth(header) else {
        return Decision::Deny(Denial::CredentialDecodeFailed);
    };

    let user = match resolve_user(store, &credentials) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!("Credential check failed for '{}': {e}", credentials.username);
            return Decision::Deny(Denial::UserUnknown);
        }
    };

    if request.image_resource {
        return Decision::Allow(Grant::ImageResource);
    }

    if user.username == request.namespace {
        return Decision::Allow(Grant::NamespaceOwner);
    }

    check_organization_access(
        store,
        &user,
        request.namespace,
        request.repository,
        request.permission,
    )
}

fn check_organization_access(
    store: &dyn AccessStore,
    user: &User,
    namespace: &str,
    repository: &str,
    permission: Permission,
) -> Decision {
    let org = match store.get_organization_by_name(namespace) {
        Ok(Some(org)) => org,
        Ok(None) => return Decision::Deny(Denial::OrganizationUnknown),
        Err(e) => {
            tracing::warn!("Failed to look up organization '{namespace}': {e}");
            return Decision::Deny(Denial::OrganizationUnknown);
        }
    };

    let owner = user.owns(&org.id);

    let repo = match store.get_repository(namespace, repository) {
        Ok(Some(repo)) => repo,
        Ok(None) if owner => return Decision::Allow(Grant::OrganizationOwner),
        Ok(None) => return Decision::Deny(Denial::NotOrganizationOwner),
        Err(e) => {
            tracing::warn!("Failed to look up repository '{namespace}/{repository}': {e}");
            return Decision::Deny(Denial::RepositoryLookupFailed);
        }
    };

    scan_team_privileges(store, user, &repo, permission)
}

/// The first privilege on the repository, in team then privilege order, decides.
fn scan_team_privileges(
    store: &dyn AccessStore,
    user: &User,
    repo: &Repository,
    permission: Permission,
) -> Decision {
    for team_id in &user.teams {
        let team = match store.get_team(team_id) {
            Ok(Some(team)) => team,
            Ok(None) => return Decision::Deny(Denial::TeamLookupFailed),
            Err(e) => {
                tracing::warn!("Failed to look up team {team_id}: {e}");
                return Decision::Deny(Denial::TeamLookupFailed);
            }
        };

        for privilege_id in &team.privileges {
            let privilege = match store.get_privilege(privilege_id) {
                Ok(Some(privilege)) => privilege,
                Ok(None) => return Decision::Deny(Denial::PrivilegeLookupFailed),
                Err(e) => {
                    tracing::warn!("Failed to look up privilege {privilege_id}: {e}");
                    return Decision::Deny(Denial::PrivilegeLookupFailed);
                }
            };

            if privilege.repository_id != repo.id {
                continue;
            }

            return if permission.granted_by(privilege.write) {
                Decision::Allow(Grant::TeamPrivilege {
                    team_id: team.id,
                    privilege_id: privilege.id,
                })
            } else {
                Decision::Deny(Denial::PrivilegeMismatch)
            };
        }
    }

    Decision::Deny(Denial::NoMatchingPrivilege)
}
