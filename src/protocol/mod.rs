//! Status protocol parsing and expectation checking.
//!
//! When invoked with `--status-fd`, gpg reports machine-readable events as
//! newline-delimited lines of the form:
//!
//! ```text
//! [GNUPG:] <TOKEN> <REST...>
//! ```
//!
//! This module decodes those lines into [`StatusLine`] values and checks a
//! decoded sequence against the responses an operation expects, either as a
//! strict ordered prefix ([`check_ordered`]) or as an unordered membership
//! requirement ([`check_unordered`]).

use thiserror::Error;

/// Status tokens consumed by this driver. Non-exhaustive with respect to
/// what gpg can emit; anything else is handled generically.
pub mod token {
    pub const INV_RECP: &str = "INV_RECP";
    pub const END_ENCRYPTION: &str = "END_ENCRYPTION";
    pub const BADSIG: &str = "BADSIG";
    pub const NODATA: &str = "NODATA";
    pub const SIG_ID: &str = "SIG_ID";
    pub const GOODSIG: &str = "GOODSIG";
    pub const VALIDSIG: &str = "VALIDSIG";
    pub const USERID_HINT: &str = "USERID_HINT";
    pub const NEED_PASSPHRASE: &str = "NEED_PASSPHRASE";
    pub const GOOD_PASSPHRASE: &str = "GOOD_PASSPHRASE";
    pub const BAD_PASSPHRASE: &str = "BAD_PASSPHRASE";
    pub const BEGIN_SIGNING: &str = "BEGIN_SIGNING";
    pub const SIG_CREATED: &str = "SIG_CREATED";
    pub const ENC_TO: &str = "ENC_TO";
    pub const PLAINTEXT: &str = "PLAINTEXT";
    pub const PLAINTEXT_LENGTH: &str = "PLAINTEXT_LENGTH";
    pub const DECRYPTION_OKAY: &str = "DECRYPTION_OKAY";
    pub const DECRYPTION_FAILED: &str = "DECRYPTION_FAILED";
    pub const GOODMDC: &str = "GOODMDC";
    pub const END_DECRYPTION: &str = "END_DECRYPTION";
    pub const IMPORT_OK: &str = "IMPORT_OK";
    pub const IMPORTED: &str = "IMPORTED";
    pub const GET_LINE: &str = "GET_LINE";
    pub const GOT_IT: &str = "GOT_IT";
    pub const GET_BOOL: &str = "GET_BOOL";
    pub const ALREADY_SIGNED: &str = "ALREADY_SIGNED";

    /// Reason code on an `INV_RECP` line: the recipient key is not trusted.
    pub const INV_NOT_TRUSTED: &str = "10";
    /// Reason codes on an `INV_RECP` line: the recipient key was not found.
    /// The documented code is "1", but "0" has been observed from gpg for
    /// the same condition; both are accepted.
    pub const INV_NOT_FOUND_A: &str = "0";
    pub const INV_NOT_FOUND_B: &str = "1";
}

/// One decoded line of status output: the event token and everything after
/// it, verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// The first field after the line marker, identifying the event.
    pub token: String,
    /// The rest of the line after the token's trailing space. May be empty
    /// and may contain embedded spaces.
    pub rest: String,
}

/// A status line that could not be decoded.
#[derive(Debug, Error)]
#[error("malformed status line: {line:?}")]
pub struct MalformedLine {
    /// The offending line, verbatim.
    pub line: String,
}

/// Decodes a single status line into a [`StatusLine`].
///
/// The marker field is discarded without validating its content; the next
/// space-delimited field becomes the token; whatever follows the token's
/// delimiter is the rest, unsplit. A line with nothing after the marker is
/// malformed, but a token with an empty rest is fine.
///
/// # Examples
///
/// ```
/// use gpgbridge::protocol::parse_line;
///
/// let line = parse_line("[GNUPG:] GOODSIG 24CB0839 Alice <alice@example.org>").unwrap();
/// assert_eq!(line.token, "GOODSIG");
/// assert_eq!(line.rest, "24CB0839 Alice <alice@example.org>");
/// ```
///
/// # Errors
///
/// Returns [`MalformedLine`] when the line is empty or carries no payload
/// beyond the marker.
pub fn parse_line(line: &str) -> Result<StatusLine, MalformedLine> {
    let payload = match line.split_once(' ') {
        Some((_marker, payload)) if !payload.is_empty() => payload,
        _ => {
            return Err(MalformedLine {
                line: line.to_string(),
            })
        }
    };

    let (token, rest) = match payload.split_once(' ') {
        Some((token, rest)) => (token, rest),
        None => (payload, ""),
    };

    Ok(StatusLine {
        token: token.to_string(),
        rest: rest.to_string(),
    })
}

/// Decodes a full status capture into a sequence of [`StatusLine`]s in
/// stream order.
///
/// A single malformed line fails the whole parse: callers treat that as an
/// unexpected-output condition, never as a partial result.
///
/// # Errors
///
/// Returns the first [`MalformedLine`] encountered.
pub fn parse_all(text: &str) -> Result<Vec<StatusLine>, MalformedLine> {
    text.lines().map(parse_line).collect()
}

/// Checks that `expected` is a strict ordered prefix of `actual`'s tokens.
///
/// No skipping is permitted: a response inserted between expected tokens
/// fails the check. Operations that tolerate interleaved extra lines use
/// [`check_unordered`] instead.
pub fn check_ordered(expected: &[&str], actual: &[StatusLine]) -> bool {
    if expected.len() > actual.len() {
        return false;
    }
    expected
        .iter()
        .zip(actual)
        .all(|(want, line)| line.token == *want)
}

/// Checks that every token in `expected` appears somewhere in `actual`,
/// position irrelevant.
pub fn check_unordered(expected: &[&str], actual: &[StatusLine]) -> bool {
    let seen: std::collections::HashSet<&str> =
        actual.iter().map(|line| line.token.as_str()).collect();
    expected.iter().all(|want| seen.contains(want))
}

/// Convenience wrapper: is `expected` among `actual`'s tokens at all?
pub fn check_single(expected: &str, actual: &[StatusLine]) -> bool {
    check_unordered(&[expected], actual)
}
