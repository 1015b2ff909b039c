use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Drive gpg's status protocol from the command line
#[derive(Parser, Debug)]
#[clap(name = "gpgbridge", about = "Drive gpg's status protocol from the command line")]
#[clap(author, version, long_about = None)]
pub struct CliArgs {
    /// Path to the gpg binary (overrides GPGBRIDGE_GPG and the platform default)
    #[clap(long, global = true)]
    pub gpg: Option<String>,

    /// Print verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the configured gpg binary exists
    Check,

    /// Print gpg's version banner
    Version,

    /// Verify signed text from stdin, reporting signer and trust level
    Verify {
        /// File holding a detached signature over the stdin payload;
        /// omit for clearsigned input
        #[clap(long)]
        signature_file: Option<PathBuf>,
    },

    /// Encrypt stdin to one or more recipients
    Encrypt {
        /// Recipient key id (repeatable)
        #[clap(short, long = "recipient", required = true)]
        recipients: Vec<String>,

        /// Hidden recipient key id (repeatable)
        #[clap(long = "hidden-recipient")]
        hidden_recipients: Vec<String>,

        /// Use recipient keys even when the web of trust would reject them
        #[clap(long)]
        always_trust: bool,

        /// Also sign the ciphertext with this key id
        #[clap(long)]
        sign: Option<String>,
    },

    /// Sign stdin, producing a detached signature or clearsigned text
    Sign {
        /// Signing key id
        #[clap(short, long)]
        key: String,

        /// Produce clearsigned text instead of a detached signature
        #[clap(long)]
        clearsign: bool,
    },

    /// Decrypt stdin, verifying an embedded signature when present
    Decrypt,

    /// Fetch a key onto the local keyring
    FetchKey {
        /// The key id to fetch
        key_id: String,

        /// Keyserver to fetch from (gpg's configured default otherwise)
        #[clap(long)]
        keyserver: Option<String>,
    },

    /// List the user ids on a key
    Uids {
        /// The key id to inspect
        key_id: String,
    },

    /// Print the fingerprint output for a key
    Fingerprint {
        /// The key id to inspect
        key_id: String,
    },

    /// Report the trust level of a key
    Trust {
        /// The key id to inspect
        key_id: String,
    },

    /// Sign one user id on a key
    SignUid {
        /// The key whose uid gets signed
        key_id: String,

        /// Index of the user id to sign, as listed by `uids`
        #[clap(long)]
        uid: u32,

        /// Certification level (0-3)
        #[clap(long, default_value_t = 0)]
        level: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_subcommand() {
        let args = CliArgs::parse_from(vec!["gpgbridge", "version"]);
        assert!(matches!(args.command, Command::Version));
        assert!(!args.verbose);
        assert!(args.gpg.is_none());
    }

    #[test]
    fn test_global_gpg_override() {
        let args = CliArgs::parse_from(vec!["gpgbridge", "version", "--gpg", "/opt/bin/gpg"]);
        assert_eq!(args.gpg.as_deref(), Some("/opt/bin/gpg"));
    }

    #[test]
    fn test_encrypt_collects_repeated_recipients() {
        let args = CliArgs::parse_from(vec![
            "gpgbridge",
            "encrypt",
            "-r",
            "24CB0839",
            "--recipient",
            "C4DC6340",
            "--hidden-recipient",
            "3592D514",
            "--always-trust",
        ]);
        match args.command {
            Command::Encrypt {
                recipients,
                hidden_recipients,
                always_trust,
                sign,
            } => {
                assert_eq!(recipients, vec!["24CB0839", "C4DC6340"]);
                assert_eq!(hidden_recipients, vec!["3592D514"]);
                assert!(always_trust);
                assert!(sign.is_none());
            }
            other => panic!("expected Encrypt, got {:?}", other),
        }
    }

    #[test]
    fn test_encrypt_requires_a_recipient() {
        let result = CliArgs::try_parse_from(vec!["gpgbridge", "encrypt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_sign_flags() {
        let args = CliArgs::parse_from(vec!["gpgbridge", "sign", "--key", "24CB0839", "--clearsign"]);
        match args.command {
            Command::Sign { key, clearsign } => {
                assert_eq!(key, "24CB0839");
                assert!(clearsign);
            }
            other => panic!("expected Sign, got {:?}", other),
        }
    }

    #[test]
    fn test_sign_uid_defaults_level_to_zero() {
        let args = CliArgs::parse_from(vec!["gpgbridge", "sign-uid", "24CB0839", "--uid", "1"]);
        match args.command {
            Command::SignUid { key_id, uid, level } => {
                assert_eq!(key_id, "24CB0839");
                assert_eq!(uid, 1);
                assert_eq!(level, 0);
            }
            other => panic!("expected SignUid, got {:?}", other),
        }
    }

    #[test]
    fn test_fetch_key_with_keyserver() {
        let args = CliArgs::parse_from(vec![
            "gpgbridge",
            "fetch-key",
            "24CB0839",
            "--keyserver",
            "hkps://keys.example.org",
        ]);
        match args.command {
            Command::FetchKey { key_id, keyserver } => {
                assert_eq!(key_id, "24CB0839");
                assert_eq!(keyserver.as_deref(), Some("hkps://keys.example.org"));
            }
            other => panic!("expected FetchKey, got {:?}", other),
        }
    }
}
