//! Encryption, optionally combined with signing.

use crate::errors::{GpgError, GpgResult};
use crate::ops::{parse_or_empty, parse_strict, GpgDriver};
use crate::protocol::token;
use crate::tmpfile::{StagedFile, TrackedPath};
use std::ffi::OsString;
use tracing::debug;

impl GpgDriver {
    /// Encrypts `plaintext` to `recipients` (and `hidden_recipients`),
    /// returning the armored ciphertext.
    ///
    /// With `always_trust`, recipient keys are used even when the web of
    /// trust would reject them. With `signer`, the ciphertext is also signed
    /// by that key.
    ///
    /// # Errors
    ///
    /// - [`GpgError::PublicKeyNotTrusted`] / [`GpgError::NoPublicKey`] /
    ///   [`GpgError::PublicKeyInvalid`] for an unusable recipient, keyed off
    ///   the `INV_RECP` reason code
    /// - [`GpgError::Unexpected`] when gpg succeeded without confirming the
    ///   encryption (or the signature, when signing)
    /// - [`GpgError::Unknown`] for unrecognized failures
    /// - [`GpgError::Internal`] for spawn or file failures
    pub fn encrypt(
        &self,
        plaintext: &str,
        recipients: &[String],
        hidden_recipients: &[String],
        always_trust: bool,
        signer: Option<&str>,
    ) -> GpgResult<String> {
        debug!(
            "encrypting {} bytes to {} recipients",
            plaintext.len(),
            recipients.len() + hidden_recipients.len()
        );

        let staged = StagedFile::create("gpgbridge_raw_", plaintext)?;
        // gpg writes the armored result next to the input; make sure it is
        // not confused by a stale file from an earlier run.
        let result = TrackedPath::track(staged.sibling(".asc"));

        let mut args: Vec<OsString> = vec![OsString::from("--encrypt"), OsString::from("--armor")];
        if let Some(signer) = signer {
            args.push(OsString::from("--sign"));
            args.push(OsString::from("--local-user"));
            args.push(OsString::from(signer));
        }
        if always_trust {
            args.push(OsString::from("--always-trust"));
        }
        for keyid in recipients {
            args.push(OsString::from("--recipient"));
            args.push(OsString::from(keyid));
        }
        for keyid in hidden_recipients {
            args.push(OsString::from("--hidden-recipient"));
            args.push(OsString::from(keyid));
        }
        args.push(staged.path().as_os_str().to_owned());

        let (exit, status_text) = self.run_batch(&args)?;

        if exit != 0 {
            let parsed = parse_or_empty(&status_text);
            // When also signing, the passphrase preamble (USERID_HINT,
            // NEED_PASSPHRASE, GOOD_PASSPHRASE) precedes the recipient line.
            let index = if signer.is_some() { 3 } else { 0 };
            return Err(match parsed.get(index) {
                Some(line) if line.token == token::INV_RECP => map_invalid_recipient(&line.rest),
                _ => GpgError::Unknown {
                    status: status_text,
                },
            });
        }

        let parsed = parse_strict(&status_text)?;
        if parsed.is_empty() {
            return Err(GpgError::Unknown {
                status: status_text,
            });
        }

        if signer.is_some() {
            let confirmed = parsed
                .get(4)
                .is_some_and(|line| line.token == token::SIG_CREATED);
            if !confirmed {
                return Err(GpgError::Unexpected {
                    status: status_text,
                });
            }
        }

        let last = &parsed[parsed.len() - 1];
        if last.token != token::END_ENCRYPTION {
            return Err(GpgError::Unexpected {
                status: status_text,
            });
        }

        result.read_to_string().map_err(|err| {
            debug!("missing encryption result file: {}", err);
            GpgError::Unknown {
                status: status_text,
            }
        })
    }
}

/// An `INV_RECP` rest opens with a numeric reason code: 10 means the key is
/// not trusted; 0 and 1 both mean the key was not found (gpg has emitted
/// either across versions for the same condition); anything else means the
/// key is expired, revoked, or otherwise unusable.
fn map_invalid_recipient(rest: &str) -> GpgError {
    let code = rest.split(' ').next().unwrap_or("");
    match code {
        token::INV_NOT_TRUSTED => GpgError::PublicKeyNotTrusted,
        token::INV_NOT_FOUND_A | token::INV_NOT_FOUND_B => GpgError::NoPublicKey,
        _ => GpgError::PublicKeyInvalid,
    }
}
