//! Error handling for the gpg driver.
//!
//! This module provides the closed [`GpgError`] taxonomy returned by every
//! driver operation, plus [`ConfigError`] for configuration-directive
//! validation and the [`GpgResult`] alias used throughout the crate.

use std::io;
use thiserror::Error;

/// The closed set of failures a gpg operation can report.
///
/// Every operation on [`crate::GpgDriver`] returns exactly one of these on
/// failure; callers can match exhaustively. I/O failures (pipe creation,
/// spawn, temp-file reads and writes) are converted to [`GpgError::Internal`]
/// at the point of occurrence and never surface as raw OS errors.
///
/// # Examples
///
/// ```
/// use gpgbridge::errors::GpgError;
///
/// let err = GpgError::BadSignature;
/// assert_eq!(err.code(), "bad_signature");
/// assert!(format!("{}", err).contains("signature"));
/// ```
#[derive(Debug, Error)]
pub enum GpgError {
    /// A spawn, pipe, or file operation failed inside the driver.
    #[error("internal error: {0}")]
    Internal(String),

    /// The secret key needed to sign or decrypt is not on the keyring.
    #[error("secret key not available")]
    NoSecretKey,

    /// The public key needed to encrypt or verify is not on the keyring.
    #[error("public key not available")]
    NoPublicKey,

    /// gpg failed but its status output did not match any known error shape.
    /// Also reported when gpg claims success but an expected result file is
    /// missing or unreadable.
    #[error("unknown gpg error: {status:?}")]
    Unknown {
        /// The raw captured status text, for diagnosis.
        status: String,
    },

    /// Signature verification failed.
    #[error("bad signature")]
    BadSignature,

    /// The signature was malformed, unreadable, or absent.
    #[error("signature not found or unreadable")]
    SignatureUnreadable,

    /// gpg produced output the driver was not expecting and the operation
    /// was abandoned.
    #[error("unexpected gpg output: {status:?}")]
    Unexpected {
        /// The raw status text (or offending line) that broke the exchange.
        status: String,
    },

    /// The key requested from a keyserver is already on the local keyring.
    #[error("key already on the local keyring")]
    KeyAlreadyPresent,

    /// At least one recipient key is not trusted.
    #[error("public key not trusted")]
    PublicKeyNotTrusted,

    /// At least one recipient key is expired, revoked, or otherwise unusable.
    #[error("public key expired, revoked, or otherwise unusable")]
    PublicKeyInvalid,

    /// The key or user id has already been signed by this key.
    #[error("key or user id already signed")]
    AlreadySigned,

    /// The passphrase was wrong, or gpg could not talk to its agent.
    #[error("bad passphrase or gpg-agent unavailable")]
    BadPassphrase,
}

impl GpgError {
    /// A stable machine-readable identifier for this error kind, used in the
    /// CLI's JSON error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            GpgError::Internal(_) => "internal_error",
            GpgError::NoSecretKey => "no_secret_key",
            GpgError::NoPublicKey => "no_public_key",
            GpgError::Unknown { .. } => "unknown_gpg_error",
            GpgError::BadSignature => "bad_signature",
            GpgError::SignatureUnreadable => "signature_unreadable",
            GpgError::Unexpected { .. } => "unexpected_gpg_output",
            GpgError::KeyAlreadyPresent => "already_have_key",
            GpgError::PublicKeyNotTrusted => "public_key_not_trusted",
            GpgError::PublicKeyInvalid => "public_key_invalid",
            GpgError::AlreadySigned => "already_signed",
            GpgError::BadPassphrase => "bad_passphrase",
        }
    }
}

impl From<io::Error> for GpgError {
    /// Internal I/O failures are folded into [`GpgError::Internal`]
    /// immediately; the caller never sees a raw `io::Error`.
    fn from(err: io::Error) -> Self {
        GpgError::Internal(err.to_string())
    }
}

/// Errors from validating configuration directives.
///
/// These are not operation outcomes: a directive is rejected when the
/// configuration is updated, before any gpg invocation happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The directive name is not on the allow-list.
    #[error("unknown configuration directive: '{key}'")]
    UnknownDirective {
        /// The rejected directive name.
        key: String,
    },

    /// A boolean directive was given something other than "true" or "false".
    #[error("directive '{key}' takes \"true\" or \"false\", got '{value}'")]
    InvalidBoolean {
        /// The directive name.
        key: String,
        /// The rejected value.
        value: String,
    },

    /// The configuration is not usable as a whole.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A type alias for `Result<T, GpgError>` to simplify driver signatures.
pub type GpgResult<T> = Result<T, GpgError>;
