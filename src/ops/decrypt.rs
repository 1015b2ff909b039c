//! Decryption with opportunistic signature checking.

use crate::errors::{GpgError, GpgResult};
use crate::ops::{parse_or_empty, parse_strict, signer_from_rest, GpgDriver, TrustLevel};
use crate::protocol::{check_single, check_unordered, token, StatusLine};
use crate::tmpfile::{StagedFile, TrackedPath};
use serde::Serialize;
use std::ffi::OsString;
use tracing::debug;

/// The result of a decryption.
#[derive(Debug, Clone, Serialize)]
pub struct DecryptOutput {
    /// The recovered plaintext.
    pub plaintext: String,
    /// The signer's user id, when the payload was also signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    /// Trust in the signing key, when the payload was also signed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<TrustLevel>,
    /// The raw captured status text, for diagnosis.
    #[serde(skip)]
    pub raw_status: String,
}

/// The responses every successful decryption must include, in any order.
const REQUIRED: &[&str] = &[
    token::ENC_TO,
    token::USERID_HINT,
    token::PLAINTEXT,
    token::PLAINTEXT_LENGTH,
    token::DECRYPTION_OKAY,
    token::GOODMDC,
    token::END_DECRYPTION,
];

/// Additionally required when the payload carried a signature.
const REQUIRED_SIGNED: &[&str] = &[token::GOODSIG, token::VALIDSIG];

impl GpgDriver {
    /// Decrypts `cipher_text`, returning the plaintext. When the payload
    /// was also signed, the signer and trust level are verified and
    /// reported the same way [`GpgDriver::verify`] reports them.
    ///
    /// # Errors
    ///
    /// - [`GpgError::NoSecretKey`] when no usable decryption key is on the
    ///   keyring
    /// - [`GpgError::BadSignature`] / [`GpgError::SignatureUnreadable`] for
    ///   a signed payload whose signature did not check out
    /// - [`GpgError::Unexpected`] when gpg succeeded without the required
    ///   confirmations
    /// - [`GpgError::Unknown`] for unrecognized failures
    /// - [`GpgError::Internal`] for spawn or file failures
    pub fn decrypt(&self, cipher_text: &str) -> GpgResult<DecryptOutput> {
        debug!("decrypting {} bytes", cipher_text.len());

        let staged = StagedFile::create("gpgbridge_raw_", cipher_text)?;
        let result = TrackedPath::track(staged.sibling(".plain"));

        let args: Vec<OsString> = vec![
            OsString::from("--output"),
            result.path().as_os_str().to_owned(),
            OsString::from("--decrypt"),
            staged.path().as_os_str().to_owned(),
        ];

        let (exit, status_text) = self.run_batch(&args)?;

        if exit != 0 {
            let parsed = parse_or_empty(&status_text);
            return Err(map_failure(&parsed, status_text));
        }

        let parsed = parse_strict(&status_text)?;
        if !check_unordered(REQUIRED, &parsed) {
            return Err(GpgError::Unexpected {
                status: status_text,
            });
        }

        let signature = if check_single(token::SIG_ID, &parsed) {
            Some(extract_signature(&parsed, &status_text)?)
        } else {
            None
        };

        let plaintext = result.read_to_string().map_err(|err| {
            debug!("missing decryption result file: {}", err);
            GpgError::Unknown {
                status: status_text.clone(),
            }
        })?;

        let (signer, trust_level) = match signature {
            Some((signer, trust)) => (Some(signer), Some(trust)),
            None => (None, None),
        };
        Ok(DecryptOutput {
            plaintext,
            signer,
            trust_level,
            raw_status: status_text,
        })
    }
}

fn map_failure(parsed: &[StatusLine], status_text: String) -> GpgError {
    if parsed.is_empty() {
        return GpgError::Unknown {
            status: status_text,
        };
    }
    if check_single(token::DECRYPTION_FAILED, parsed) {
        return GpgError::NoSecretKey;
    }
    if check_single(token::SIG_ID, parsed) {
        if check_single(token::BADSIG, parsed) {
            return GpgError::BadSignature;
        }
        if check_single(token::NODATA, parsed) {
            return GpgError::SignatureUnreadable;
        }
    }
    GpgError::Unknown {
        status: status_text,
    }
}

/// Pulls the signer and trust level out of a signed decryption: the signer
/// rides on line 8's remainder and the trust token on line 10, the fixed
/// positions gpg uses for an encrypt-then-sign payload.
fn extract_signature(
    parsed: &[StatusLine],
    status_text: &str,
) -> GpgResult<(String, TrustLevel)> {
    if !check_unordered(REQUIRED_SIGNED, parsed) {
        return Err(GpgError::Unexpected {
            status: status_text.to_string(),
        });
    }

    let signer_line = parsed.get(8).ok_or_else(|| GpgError::Unexpected {
        status: status_text.to_string(),
    })?;
    let trust_level = parsed
        .get(10)
        .and_then(|line| TrustLevel::from_token(&line.token))
        .ok_or_else(|| GpgError::Unexpected {
            status: status_text.to_string(),
        })?;

    Ok((signer_from_rest(&signer_line.rest), trust_level))
}
