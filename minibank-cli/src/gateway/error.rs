//! Mapping from core errors to GraphQL errors
//!
//! Every error carries `extensions.code`. Storage failures are logged in full
//! and shown to clients only as a generic message.

use async_graphql::ErrorExtensions;
use minibank_core::{Error, ErrorKind};

const STORE_MESSAGE: &str = "internal storage error";
const LOGIN_MESSAGE: &str = "invalid credentials";
const ACCOUNT_MESSAGE: &str = "account not found or not accessible";

fn with_code(message: impl Into<String>, kind: ErrorKind) -> async_graphql::Error {
    async_graphql::Error::new(message).extend_with(|_, ext| ext.set("code", kind.code()))
}

pub fn to_graphql_error(err: Error) -> async_graphql::Error {
    match err {
        Error::Store(detail) => {
            tracing::error!(error = %detail, "storage failure");
            with_code(STORE_MESSAGE, ErrorKind::Store)
        }
        other => with_code(other.message(), other.kind()),
    }
}

/// Login failures look the same whether the user is unknown or the
/// password is wrong.
pub fn login_error(err: Error) -> async_graphql::Error {
    match err {
        Error::NotFound(_) | Error::Auth(_) => with_code(LOGIN_MESSAGE, ErrorKind::Auth),
        other => to_graphql_error(other),
    }
}

/// Missing and foreign accounts look the same, so other users cannot tell
/// which account ids exist.
pub fn account_error(err: Error) -> async_graphql::Error {
    match err {
        Error::NotFound(_) | Error::Auth(_) => with_code(ACCOUNT_MESSAGE, ErrorKind::Auth),
        other => to_graphql_error(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Value;

    fn code(err: &async_graphql::Error) -> Option<Value> {
        err.extensions.as_ref().and_then(|ext| ext.get("code").cloned())
    }

    #[test]
    fn test_codes_follow_kind() {
        let err = to_graphql_error(Error::validation("amount must be positive"));
        assert_eq!(err.message, "amount must be positive");
        assert_eq!(code(&err), Some(Value::from("VALIDATION_ERROR")));

        let err = to_graphql_error(Error::conflict("taken"));
        assert_eq!(code(&err), Some(Value::from("CONFLICT")));
    }

    #[test]
    fn test_store_detail_is_hidden() {
        let err = to_graphql_error(Error::store("IO Error: disk /var/lib/secret full"));
        assert_eq!(err.message, STORE_MESSAGE);
        assert_eq!(code(&err), Some(Value::from("STORE_ERROR")));
    }

    #[test]
    fn test_login_failures_are_uniform() {
        let unknown = login_error(Error::not_found("user not found"));
        let wrong = login_error(Error::auth("invalid credentials"));
        assert_eq!(unknown.message, wrong.message);
        assert_eq!(code(&unknown), code(&wrong));
        assert_eq!(code(&wrong), Some(Value::from("AUTH_ERROR")));
    }

    #[test]
    fn test_account_access_failures_are_uniform() {
        let missing = account_error(Error::not_found("account 9 not found"));
        let foreign = account_error(Error::auth("account does not belong to the current user"));
        assert_eq!(missing.message, ACCOUNT_MESSAGE);
        assert_eq!(missing.message, foreign.message);
        assert_eq!(code(&missing), Some(Value::from("AUTH_ERROR")));

        let invalid = account_error(Error::validation("insufficient funds"));
        assert_eq!(code(&invalid), Some(Value::from("VALIDATION_ERROR")));
    }
}
