//! High-level gpg operations.
//!
//! Each operation stages its payloads, builds an argument vector, opens a
//! process session, drives the exchange (one batch round-trip for most
//! operations, a multi-turn conversation for key signing), validates the
//! parsed status output, and maps failures onto the closed
//! [`GpgError`](crate::errors::GpgError) taxonomy.
//!
//! # Module Structure
//!
//! - `verify`: signature verification (detached and clearsigned)
//! - `encrypt`: encryption, optionally combined with signing
//! - `sign`: detached and clearsign signing
//! - `decrypt`: decryption with opportunistic signature checking
//! - `keyring`: version/install checks, key fetching, uid/fingerprint/trust
//!   inspection
//! - `edit`: the interactive uid-signing conversation

pub mod decrypt;
pub mod edit;
pub mod encrypt;
pub mod keyring;
pub mod sign;
pub mod verify;

use crate::config::GpgConfig;
use crate::errors::{GpgError, GpgResult};
use crate::protocol::{self, StatusLine};
use crate::session::{GpgSpawner, Spawner};
use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use tracing::debug;

pub use decrypt::DecryptOutput;
pub use verify::SignerInfo;

/// The driver: one validated configuration plus a session spawner.
///
/// Operations are synchronous and serial; at most one subprocess session is
/// live at a time. The spawner is injectable so tests can substitute a
/// scripted transport.
///
/// # Examples
///
/// ```no_run
/// use gpgbridge::{GpgConfig, GpgDriver};
///
/// let mut config = GpgConfig::load()?;
/// config.set_directive(gpgbridge::config::DIRECTIVE_INITIALIZED, "true")?;
/// let driver = GpgDriver::new(config);
/// let version = driver.version()?;
/// println!("{}", version);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// For tests, substitute the spawner with [`GpgDriver::with_spawner`].
pub struct GpgDriver {
    config: GpgConfig,
    spawner: Box<dyn Spawner>,
}

impl GpgDriver {
    /// Creates a driver backed by the real gpg binary.
    pub fn new(config: GpgConfig) -> Self {
        GpgDriver::with_spawner(config, Box::new(GpgSpawner))
    }

    /// Creates a driver with an injected spawner (used by tests to replay
    /// canned status output).
    pub fn with_spawner(config: GpgConfig, spawner: Box<dyn Spawner>) -> Self {
        GpgDriver { config, spawner }
    }

    /// The driver's configuration.
    pub fn config(&self) -> &GpgConfig {
        &self.config
    }

    /// One batch round-trip: spawn, write the blank passphrase-prompt line,
    /// drain the status channel to end-of-stream, wait for exit.
    ///
    /// gpg reads its command channel before doing anything; when no
    /// passphrase is needed, a bare newline satisfies it.
    fn run_batch(&self, extra_args: &[OsString]) -> GpgResult<(i32, String)> {
        if !self.config.initialized() {
            return Err(GpgError::Internal("driver is not initialized".to_string()));
        }

        let mut session = self.spawner.spawn(&self.config, extra_args)?;
        session.send_line("")?;
        let status_text = session.read_to_end()?;
        let exit = session.wait()?;
        debug!("gpg exited with status {}", exit);
        Ok((exit, status_text))
    }
}

/// Parses captured status text, treating a malformed capture as empty.
///
/// Used on failure paths, where the exit status already decided the outcome
/// and the status text is only consulted to pick an error kind.
pub(crate) fn parse_or_empty(status_text: &str) -> Vec<StatusLine> {
    protocol::parse_all(status_text).unwrap_or_default()
}

/// Parses captured status text strictly; a malformed capture is an
/// unexpected-output failure. Used on success paths.
pub(crate) fn parse_strict(status_text: &str) -> GpgResult<Vec<StatusLine>> {
    protocol::parse_all(status_text).map_err(|_| GpgError::Unexpected {
        status: status_text.to_string(),
    })
}

/// Extracts the signer's user id from a `GOODSIG` rest: the first field is
/// the key id, everything after it is the signer, verbatim.
pub(crate) fn signer_from_rest(rest: &str) -> String {
    rest.split_once(' ')
        .map(|(_keyid, signer)| signer.to_string())
        .unwrap_or_default()
}

/// How much a key owner's identity is trusted.
///
/// Decoded either from a `TRUST_*` status token (verification) or from the
/// validity flag of a `pub` colon record (key listing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    Unknown,
    Invalid,
    Revoked,
    Expired,
    Untrusted,
    Marginal,
    Full,
    Ultimate,
}

impl TrustLevel {
    /// The canonical `TRUST_*` label for this level.
    pub fn as_token(&self) -> &'static str {
        match self {
            TrustLevel::Unknown => "TRUST_UNKNOWN",
            TrustLevel::Invalid => "TRUST_INVALID",
            TrustLevel::Revoked => "TRUST_REVOKED",
            TrustLevel::Expired => "TRUST_EXPIRED",
            TrustLevel::Untrusted => "TRUST_UNTRUSTED",
            TrustLevel::Marginal => "TRUST_MARGINAL",
            TrustLevel::Full => "TRUST_FULL",
            TrustLevel::Ultimate => "TRUST_ULTIMATE",
        }
    }

    /// Decodes a `TRUST_*` status token. Accepts gpg's own spellings
    /// (`TRUST_FULLY`, `TRUST_NEVER`, `TRUST_UNDEFINED`) alongside the
    /// canonical labels.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TRUST_UNKNOWN" | "TRUST_UNDEFINED" => Some(TrustLevel::Unknown),
            "TRUST_INVALID" => Some(TrustLevel::Invalid),
            "TRUST_REVOKED" => Some(TrustLevel::Revoked),
            "TRUST_EXPIRED" => Some(TrustLevel::Expired),
            "TRUST_UNTRUSTED" | "TRUST_NEVER" => Some(TrustLevel::Untrusted),
            "TRUST_MARGINAL" => Some(TrustLevel::Marginal),
            "TRUST_FULL" | "TRUST_FULLY" => Some(TrustLevel::Full),
            "TRUST_ULTIMATE" => Some(TrustLevel::Ultimate),
            _ => None,
        }
    }

    /// Decodes the validity flag from field 1 of a `pub` colon record.
    pub(crate) fn from_record_flag(flag: char) -> Option<Self> {
        match flag {
            'f' => Some(TrustLevel::Full),
            'u' => Some(TrustLevel::Ultimate),
            'i' => Some(TrustLevel::Invalid),
            'r' => Some(TrustLevel::Revoked),
            'e' => Some(TrustLevel::Expired),
            '-' | 'q' => Some(TrustLevel::Unknown),
            'n' => Some(TrustLevel::Untrusted),
            'm' => Some(TrustLevel::Marginal),
            _ => None,
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl Serialize for TrustLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_token())
    }
}

/// An initialized configuration for exercising operations against the
/// scripted spawner.
#[cfg(test)]
pub(crate) fn test_config() -> GpgConfig {
    let mut config = GpgConfig::default();
    config
        .set_directive(crate::config::DIRECTIVE_INITIALIZED, "true")
        .unwrap();
    config
}
