use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Why a policy gate refused an otherwise authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// The caller's account is not active
    Inactive,
    /// The operation needs the admin role
    AdminRequired,
    /// An admin tried to deactivate their own account
    SelfAction,
}

impl std::fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForbiddenReason::Inactive => write!(f, "inactive"),
            ForbiddenReason::AdminRequired => write!(f, "admin required"),
            ForbiddenReason::SelfAction => write!(f, "cannot act on self"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingField(Vec<&'static str>),

    #[error("Invalid email: {0}")]
    InvalidFormat(String),

    #[error("{0}")]
    WeakPassword(String),

    #[error("Account with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(&'static str),

    #[error("Forbidden: {0}")]
    Forbidden(ForbiddenReason),

    #[error("Account not found: {0}")]
    NotFound(Uuid),

    #[error("No valid fields to update")]
    NoFields,

    #[error("Field '{0}' cannot be empty")]
    EmptyField(&'static str),

    #[error("Store failure: {0}")]
    StoreFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AccountResult<T> = Result<T, AccountError>;

/// Failure verifying a bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token malformed or signature invalid")]
    Malformed,
}

impl From<TokenError> for AccountError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AccountError::Unauthenticated("expired token"),
            TokenError::Malformed => AccountError::Unauthenticated("invalid token"),
        }
    }
}

impl AccountError {
    /// Stable machine-readable code for the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            AccountError::MissingField(_) => "missing_field",
            AccountError::InvalidFormat(_) => "invalid_format",
            AccountError::WeakPassword(_) => "weak_password",
            AccountError::DuplicateEmail(_) => "duplicate_email",
            AccountError::InvalidCredentials => "invalid_credentials",
            AccountError::Unauthenticated(_) => "unauthenticated",
            AccountError::Forbidden(_) => "forbidden",
            AccountError::NotFound(_) => "not_found",
            AccountError::NoFields => "no_fields",
            AccountError::EmptyField(_) => "empty_field",
            AccountError::StoreFailure(_) => "store_failure",
            AccountError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to hand back to the caller.
    ///
    /// Store and internal faults are replaced with a generic message; token
    /// failures collapse to a single message. The detail is logged where the
    /// fault is raised.
    pub fn public_message(&self) -> String {
        match self {
            AccountError::Unauthenticated(_) => "Invalid or expired token".to_string(),
            AccountError::Forbidden(ForbiddenReason::Inactive) => {
                "Account is inactive. Please contact administrator.".to_string()
            }
            AccountError::Forbidden(ForbiddenReason::AdminRequired) => {
                "Admin role required".to_string()
            }
            AccountError::Forbidden(ForbiddenReason::SelfAction) => {
                "You cannot deactivate your own account".to_string()
            }
            AccountError::NotFound(_) => "Account not found".to_string(),
            AccountError::StoreFailure(_) | AccountError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether the failure was caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AccountError::StoreFailure(_) | AccountError::Internal(_)
        )
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: ErrorDetail {
                kind: self.kind(),
                message: self.public_message(),
            },
        }
    }
}

/// Serialized error shape handed to the HTTP shell
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
}
