/*!
# gpgbridge

gpgbridge drives an external GnuPG binary through its machine-readable
status protocol (`--status-fd`/`--command-fd`) and exposes signing,
encryption, decryption, key-trust inspection, and key-signing as structured
results. It implements no cryptography itself: gpg does the work, this crate
does the exact pipe wiring, status-stream parsing, response validation, and
secret-safe temp-file staging around it.

## Architecture

The codebase follows a modular architecture with clear separation of concerns:

- `cli`: Command-line interface handling using clap
- `config`: Configuration directives and validation
- `errors`: The closed error taxonomy operations report
- `protocol`: Status-line parsing and expectation checking
- `session`: Subprocess spawning and the live pipe session
- `tmpfile`: Secret-safe staging files with guaranteed cleanup
- `ops`: The operations themselves, batch and interactive

## Usage Example

```rust,no_run
use gpgbridge::{GpgConfig, GpgDriver};

fn main() -> gpgbridge::GpgResult<()> {
    let mut config = GpgConfig::default();
    config
        .set_directive(gpgbridge::config::DIRECTIVE_INITIALIZED, "true")
        .expect("known directive");
    let driver = GpgDriver::new(config);

    let info = driver.verify("-----BEGIN PGP SIGNED MESSAGE-----\n...", "")?;
    println!("signed by {} ({})", info.signer, info.trust_level);
    Ok(())
}
```
*/

/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration directives and validation
pub mod config;
/// Error types and utilities for error handling
pub mod errors;
/// High-level gpg operations
pub mod ops;
/// Status protocol parsing and expectation checking
pub mod protocol;
/// Subprocess spawning and the live pipe session
pub mod session;
/// Secret-safe staging files
pub mod tmpfile;

// Re-export important types for convenience
pub use config::GpgConfig;
pub use errors::{ConfigError, GpgError, GpgResult};
pub use ops::{DecryptOutput, GpgDriver, SignerInfo, TrustLevel};
