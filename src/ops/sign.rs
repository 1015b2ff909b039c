//! Detached and clearsign signing.

use crate::errors::{GpgError, GpgResult};
use crate::ops::{parse_or_empty, parse_strict, GpgDriver};
use crate::protocol::{check_ordered, check_single, token};
use crate::tmpfile::{StagedFile, TrackedPath};
use std::ffi::OsString;
use tracing::debug;

/// The responses a successful signing run must open with, in order.
const EXPECTED: &[&str] = &[
    token::USERID_HINT,
    token::NEED_PASSPHRASE,
    token::GOOD_PASSPHRASE,
    token::BEGIN_SIGNING,
    token::SIG_CREATED,
];

impl GpgDriver {
    /// Signs `plaintext` with `keyid`, returning the armored detached
    /// signature, or the clearsigned text when `clearsign` is set.
    ///
    /// # Errors
    ///
    /// - [`GpgError::NoSecretKey`] when the signing key is unavailable —
    ///   gpg reports this with no status output at all, so an empty capture
    ///   plus a non-zero exit is the signal
    /// - [`GpgError::BadPassphrase`] when gpg's agent rejected the
    ///   passphrase
    /// - [`GpgError::Unexpected`] when gpg succeeded without the expected
    ///   confirmation sequence
    /// - [`GpgError::Unknown`] for unrecognized failures
    /// - [`GpgError::Internal`] for spawn or file failures
    pub fn sign(&self, plaintext: &str, keyid: &str, clearsign: bool) -> GpgResult<String> {
        debug!("signing {} bytes with {}", plaintext.len(), keyid);

        let staged = StagedFile::create("gpgbridge_raw_", plaintext)?;
        let result = TrackedPath::track(staged.sibling(".asc"));

        let mode = if clearsign {
            "--clearsign"
        } else {
            "--detach-sign"
        };
        let args: Vec<OsString> = vec![
            OsString::from("--armor"),
            OsString::from(mode),
            OsString::from("--local-user"),
            OsString::from(keyid),
            staged.path().as_os_str().to_owned(),
        ];

        let (exit, status_text) = self.run_batch(&args)?;

        if exit != 0 {
            if status_text.is_empty() {
                return Err(GpgError::NoSecretKey);
            }
            let parsed = parse_or_empty(&status_text);
            return Err(if check_single(token::BAD_PASSPHRASE, &parsed) {
                GpgError::BadPassphrase
            } else {
                GpgError::Unknown {
                    status: status_text,
                }
            });
        }

        let parsed = parse_strict(&status_text)?;
        if !check_ordered(EXPECTED, &parsed) {
            return Err(GpgError::Unexpected {
                status: status_text,
            });
        }

        result.read_to_string().map_err(|err| {
            debug!("missing signature result file: {}", err);
            GpgError::Unknown {
                status: status_text,
            }
        })
    }
}
