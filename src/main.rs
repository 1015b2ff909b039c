/*!
# gpgbridge

A command-line front end for the gpg protocol driver. Payloads are read from
stdin, results are printed to stdout as JSON, and failures are printed to
stderr as a JSON envelope (`{"error": ..., "code": ...}`) with exit status 1.

## Usage

```text
gpgbridge [--gpg PATH] [--verbose] <COMMAND>

Commands:
  check        Check that the configured gpg binary exists
  version      Print gpg's version banner
  verify       Verify signed text from stdin
  encrypt      Encrypt stdin to one or more recipients
  sign         Sign stdin
  decrypt      Decrypt stdin
  fetch-key    Fetch a key onto the local keyring
  uids         List the user ids on a key
  fingerprint  Print the fingerprint output for a key
  trust        Report the trust level of a key
  sign-uid     Sign one user id on a key
```

## Configuration

- `GPGBRIDGE_GPG`: Path to the gpg binary (the `--gpg` flag wins over it)
- `RUST_LOG`: Log filtering; `--verbose` defaults it to `debug`
*/

use clap::Parser;
use gpgbridge::cli::{CliArgs, Command};
use gpgbridge::config::{DIRECTIVE_BINARY_PATH, DIRECTIVE_INITIALIZED};
use gpgbridge::errors::{ConfigError, GpgError};
use gpgbridge::{GpgConfig, GpgDriver};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, error};
use zeroize::Zeroizing;

/// What the error envelope carries: a stable code plus a human-readable
/// message.
struct Failure {
    code: &'static str,
    message: String,
}

impl From<GpgError> for Failure {
    fn from(err: GpgError) -> Self {
        Failure {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<ConfigError> for Failure {
    fn from(err: ConfigError) -> Self {
        Failure {
            code: "configuration_error",
            message: err.to_string(),
        }
    }
}

impl From<io::Error> for Failure {
    fn from(err: io::Error) -> Self {
        Failure {
            code: "io_error",
            message: err.to_string(),
        }
    }
}

fn main() {
    let args = CliArgs::parse();
    init_tracing(args.verbose);

    if let Err(failure) = run(args) {
        error!("{}", failure.message);
        eprintln!(
            "{}",
            json!({ "error": failure.message, "code": failure.code })
        );
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays clean for JSON results.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: CliArgs) -> Result<(), Failure> {
    let mut config = GpgConfig::load()?;
    if let Some(path) = &args.gpg {
        config.set_directive(DIRECTIVE_BINARY_PATH, path)?;
    }
    config.set_directive(DIRECTIVE_INITIALIZED, "true")?;
    config.validate()?;

    debug!("using gpg at {}", config.binary_path().display());
    let driver = GpgDriver::new(config);

    match args.command {
        Command::Check => emit(&json!({ "installed": driver.is_installed() })),
        Command::Version => {
            let version = driver.version()?;
            emit(&json!({ "version": version }))
        }
        Command::Verify { signature_file } => {
            let payload = read_stdin()?;
            let signature = match &signature_file {
                Some(path) => read_signature(path)?,
                None => String::new(),
            };
            let info = driver.verify(&payload, &signature)?;
            emit(&info)
        }
        Command::Encrypt {
            recipients,
            hidden_recipients,
            always_trust,
            sign,
        } => {
            let payload = read_stdin()?;
            let cipher_text = driver.encrypt(
                &payload,
                &recipients,
                &hidden_recipients,
                always_trust,
                sign.as_deref(),
            )?;
            emit(&json!({ "cipher_text": cipher_text }))
        }
        Command::Sign { key, clearsign } => {
            let payload = read_stdin()?;
            let signature = driver.sign(&payload, &key, clearsign)?;
            emit(&json!({ "signature": signature }))
        }
        Command::Decrypt => {
            let payload = read_stdin()?;
            let output = driver.decrypt(&payload)?;
            emit(&output)
        }
        Command::FetchKey { key_id, keyserver } => {
            driver.fetch_key(&key_id, keyserver.as_deref())?;
            emit(&json!({ "fetched": true }))
        }
        Command::Uids { key_id } => {
            let uids = driver.list_uids(&key_id)?;
            emit(&json!({ "uids": uids }))
        }
        Command::Fingerprint { key_id } => {
            let fingerprint = driver.fingerprint(&key_id)?;
            emit(&json!({ "fingerprint": fingerprint }))
        }
        Command::Trust { key_id } => {
            let trust_level = driver.trust_level(&key_id)?;
            emit(&json!({ "trust_level": trust_level }))
        }
        Command::SignUid { key_id, uid, level } => {
            driver.sign_uid(&key_id, uid, level)?;
            emit(&json!({ "signed": true }))
        }
    }
}

/// Reads the whole payload from stdin into a buffer that is wiped on drop;
/// plaintext going to (or coming from) gpg may be secret.
fn read_stdin() -> Result<Zeroizing<String>, Failure> {
    let mut payload = Zeroizing::new(String::new());
    io::stdin().read_to_string(&mut payload)?;
    Ok(payload)
}

fn read_signature(path: &Path) -> Result<String, Failure> {
    fs::read_to_string(path).map_err(|err| Failure {
        code: "io_error",
        message: format!("failed to read signature file {}: {}", path.display(), err),
    })
}

fn emit<T: Serialize>(value: &T) -> Result<(), Failure> {
    let rendered = serde_json::to_string(value).map_err(|err| Failure {
        code: "internal_error",
        message: format!("failed to render result: {}", err),
    })?;
    println!("{}", rendered);
    Ok(())
}
