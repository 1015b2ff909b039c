//! Signature verification.

use crate::errors::{GpgError, GpgResult};
use crate::ops::{parse_or_empty, parse_strict, signer_from_rest, GpgDriver, TrustLevel};
use crate::protocol::{check_ordered, token};
use crate::tmpfile::StagedFile;
use serde::Serialize;
use std::ffi::OsString;
use tracing::debug;

/// Who signed a payload, and how much their key is trusted.
#[derive(Debug, Clone, Serialize)]
pub struct SignerInfo {
    /// The signer's user id, as reported on the `GOODSIG` line.
    pub signer: String,
    /// Trust in the signing key.
    pub trust_level: TrustLevel,
    /// The raw captured status text, for diagnosis.
    #[serde(skip)]
    pub raw_status: String,
}

/// The responses a successful verification must open with, in order.
const EXPECTED: &[&str] = &[token::SIG_ID, token::GOODSIG, token::VALIDSIG];

impl GpgDriver {
    /// Verifies a signature over `signed_text`.
    ///
    /// Two ways to call this: with `signature` holding a detached signature
    /// over `signed_text`, or with an empty `signature` when `signed_text`
    /// is clearsigned and carries its own signature.
    ///
    /// # Errors
    ///
    /// - [`GpgError::BadSignature`] when verification failed
    /// - [`GpgError::SignatureUnreadable`] when there was no readable
    ///   signature in the payload
    /// - [`GpgError::Unexpected`] when gpg succeeded but reported something
    ///   other than the expected response sequence
    /// - [`GpgError::Unknown`] for unrecognized failures
    /// - [`GpgError::Internal`] for spawn or file failures
    pub fn verify(&self, signed_text: &str, signature: &str) -> GpgResult<SignerInfo> {
        debug!("verifying {} bytes of signed text", signed_text.len());

        let signed = StagedFile::create("gpgbridge_signed_", signed_text)?;
        let detached = if signature.is_empty() {
            None
        } else {
            Some(StagedFile::create("gpgbridge_sig_", signature)?)
        };

        let mut args: Vec<OsString> = vec![OsString::from("--verify")];
        if let Some(sig) = &detached {
            args.push(sig.path().as_os_str().to_owned());
        }
        args.push(signed.path().as_os_str().to_owned());

        let (exit, status_text) = self.run_batch(&args)?;

        if exit != 0 {
            let parsed = parse_or_empty(&status_text);
            return Err(match parsed.first() {
                Some(line) if line.token == token::BADSIG => GpgError::BadSignature,
                Some(line) if line.token == token::NODATA => GpgError::SignatureUnreadable,
                _ => GpgError::Unknown {
                    status: status_text,
                },
            });
        }

        let parsed = parse_strict(&status_text)?;
        if !check_ordered(EXPECTED, &parsed) {
            return Err(GpgError::Unexpected {
                status: status_text,
            });
        }

        // The trust token follows the three-line verification preamble.
        let trust_level = parsed
            .get(3)
            .and_then(|line| TrustLevel::from_token(&line.token))
            .ok_or_else(|| GpgError::Unexpected {
                status: status_text.clone(),
            })?;

        Ok(SignerInfo {
            signer: signer_from_rest(&parsed[1].rest),
            trust_level,
            raw_status: status_text,
        })
    }
}
