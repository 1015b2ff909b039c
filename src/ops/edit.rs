//! Interactive uid signing over gpg's `--edit-key` conversation.
//!
//! Unlike the batch operations, signing a uid needs a scripted back-and-forth:
//! gpg prompts, the driver answers, and a confirmation arrives only after
//! several exchanges. Each step reads exactly one status line and branches on
//! its token; anything off-script kills the subprocess (which is then reaped)
//! and surfaces as unexpected output.

use crate::errors::{GpgError, GpgResult};
use crate::ops::GpgDriver;
use crate::protocol::{parse_line, token, StatusLine};
use crate::session::Session;
use std::ffi::OsString;
use tracing::debug;

/// Where the conversation ended up. Terminal alternatives end the exchange
/// without further commands; the session is reaped either way.
enum Outcome {
    Signed,
    AlreadySigned,
    BadPassphrase,
}

impl GpgDriver {
    /// Signs uid number `uid_index` on `keyid` at certification level
    /// `cert_level` (0-3), using the key owner's default signing key.
    ///
    /// # Errors
    ///
    /// - [`GpgError::AlreadySigned`] when the uid already carries this
    ///   signature; reported as soon as gpg says so, with no further
    ///   commands sent
    /// - [`GpgError::BadPassphrase`] when gpg's agent rejected the
    ///   passphrase
    /// - [`GpgError::Unexpected`] when the conversation went off-script;
    ///   the subprocess is forcibly terminated and reaped
    /// - [`GpgError::Internal`] for spawn or pipe failures
    pub fn sign_uid(&self, keyid: &str, uid_index: u32, cert_level: u8) -> GpgResult<()> {
        if !self.config().initialized() {
            return Err(GpgError::Internal("driver is not initialized".to_string()));
        }
        debug!("signing uid {} on {} at level {}", uid_index, keyid, cert_level);

        let args = [
            OsString::from("--default-cert-level"),
            OsString::from(cert_level.to_string()),
            OsString::from("--edit-key"),
            OsString::from(keyid),
        ];
        let mut session = self.spawner.spawn(&self.config, &args)?;

        match converse(session.as_mut(), &uid_index.to_string()) {
            Ok(outcome) => {
                // Closing our end of the command channel ends the edit
                // session; gpg acknowledged every step already, so the exit
                // status carries no further information.
                session.wait()?;
                match outcome {
                    Outcome::Signed => Ok(()),
                    Outcome::AlreadySigned => Err(GpgError::AlreadySigned),
                    Outcome::BadPassphrase => Err(GpgError::BadPassphrase),
                }
            }
            Err(err) => {
                session.kill();
                let _ = session.wait();
                Err(err)
            }
        }
    }
}

/// Runs the scripted exchange. Every mismatch is an error; the caller owns
/// the forced termination.
fn converse(session: &mut dyn Session, uid_selector: &str) -> GpgResult<Outcome> {
    expect(session, token::GET_LINE)?;
    session.send_line(uid_selector)?;
    expect(session, token::GOT_IT)?;

    expect(session, token::GET_LINE)?;
    session.send_line("sign")?;
    expect(session, token::GOT_IT)?;

    let line = next(session)?;
    if line.token == token::ALREADY_SIGNED {
        return Ok(Outcome::AlreadySigned);
    }
    if line.token != token::GET_BOOL {
        return Err(off_script(token::GET_BOOL, &line));
    }

    session.send_line("Y")?;
    expect(session, token::GOT_IT)?;
    expect(session, token::USERID_HINT)?;
    expect(session, token::NEED_PASSPHRASE)?;

    // gpg-agent answers BAD_PASSPHRASE after the first failed prompt and
    // gives no further feedback on a good retry, so one read decides.
    let line = next(session)?;
    if line.token == token::BAD_PASSPHRASE {
        return Ok(Outcome::BadPassphrase);
    }
    if line.token != token::GOOD_PASSPHRASE {
        return Err(off_script(token::GOOD_PASSPHRASE, &line));
    }

    expect(session, token::GET_LINE)?;
    session.send_line("save")?;
    Ok(Outcome::Signed)
}

/// Reads and parses exactly one status line.
fn next(session: &mut dyn Session) -> GpgResult<StatusLine> {
    let line = session.read_line()?.ok_or_else(|| GpgError::Unexpected {
        status: "status channel closed mid-conversation".to_string(),
    })?;
    parse_line(&line).map_err(|_| GpgError::Unexpected { status: line })
}

/// Reads one status line and requires its token to be `want`.
fn expect(session: &mut dyn Session, want: &str) -> GpgResult<StatusLine> {
    let line = next(session)?;
    if line.token == want {
        Ok(line)
    } else {
        Err(off_script(want, &line))
    }
}

fn off_script(wanted: &str, got: &StatusLine) -> GpgError {
    debug!("was expecting {}, got {}", wanted, got.token);
    GpgError::Unexpected {
        status: format!("expected {}, got {} {}", wanted, got.token, got.rest),
    }
}
