mod credentials;
mod gatekeeper;
mod password;
mod resolver;

pub use credentials::{
    BasicCredentials, CredentialError, decode_basic_auth, encode_basic_auth, is_basic_scheme,
    resolve_user,
};
pub use gatekeeper::{Target, check_request, classify_path, require_access};
pub use password::PasswordHasher;
pub use resolver::{AccessRequest, Decision, Denial, Grant, authorize};
