//! Keyring inspection and maintenance: version and install checks, key
//! fetching, and uid/fingerprint/trust queries.
//!
//! The listing operations (`--fingerprint`, `--list-keys`) never produce the
//! standard status lines; their colon-record output arrives on the same
//! channel and is picked apart by field instead.

use crate::errors::{GpgError, GpgResult};
use crate::ops::{parse_or_empty, parse_strict, GpgDriver, TrustLevel};
use crate::protocol::token;
use std::ffi::OsString;
use tracing::debug;

impl GpgDriver {
    /// Whether the configured gpg binary exists on disk. Hosts should check
    /// this before anything else.
    pub fn is_installed(&self) -> bool {
        self.config().binary_path().exists()
    }

    /// Returns gpg's version banner (`gpg --version`), verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`GpgError::Internal`] if gpg could not be run or exited
    /// non-zero.
    pub fn version(&self) -> GpgResult<String> {
        let args = [OsString::from("--version")];
        let (exit, text) = self.run_batch(&args)?;
        if exit != 0 {
            return Err(GpgError::Internal(format!(
                "gpg --version exited with status {}",
                exit
            )));
        }
        Ok(text)
    }

    /// Fetches `keyid` onto the local keyring, from `keyserver` when given
    /// (gpg's configured default otherwise).
    ///
    /// # Errors
    ///
    /// - [`GpgError::NoPublicKey`] when the keyserver had no such key
    /// - [`GpgError::KeyAlreadyPresent`] when the key was already on the
    ///   keyring — a sort-of success, reported distinctly
    /// - [`GpgError::Unexpected`] / [`GpgError::Unknown`] otherwise
    pub fn fetch_key(&self, keyid: &str, keyserver: Option<&str>) -> GpgResult<()> {
        debug!("fetching key {}", keyid);

        let mut args: Vec<OsString> = Vec::new();
        if let Some(keyserver) = keyserver {
            args.push(OsString::from("--keyserver"));
            args.push(OsString::from(keyserver));
        }
        args.push(OsString::from("--recv-key"));
        args.push(OsString::from(keyid));

        let (exit, status_text) = self.run_batch(&args)?;

        if exit != 0 {
            let parsed = parse_or_empty(&status_text);
            return Err(match parsed.first() {
                Some(line) if line.token == token::NODATA => GpgError::NoPublicKey,
                _ => GpgError::Unknown {
                    status: status_text,
                },
            });
        }

        let parsed = parse_strict(&status_text)?;
        match parsed.first() {
            Some(line) if line.token == token::IMPORT_OK => Err(GpgError::KeyAlreadyPresent),
            Some(line) if line.token == token::IMPORTED => Ok(()),
            _ => Err(GpgError::Unexpected {
                status: status_text,
            }),
        }
    }

    /// Lists the user ids on `keyid`.
    ///
    /// # Errors
    ///
    /// Returns [`GpgError::NoPublicKey`] when gpg exits non-zero: the
    /// listing commands give no status output, and a failure here almost
    /// certainly means the key is absent.
    pub fn list_uids(&self, keyid: &str) -> GpgResult<Vec<String>> {
        let args = [
            OsString::from("--with-colons"),
            OsString::from("--fixed-list-mode"),
            OsString::from("--fingerprint"),
            OsString::from(keyid),
        ];
        let (exit, text) = self.run_batch(&args)?;
        if exit != 0 {
            return Err(GpgError::NoPublicKey);
        }

        let uids = text
            .lines()
            .filter_map(|line| {
                let fields: Vec<&str> = line.split(':').collect();
                match fields.first() {
                    Some(&"uid") => fields.get(9).map(|uid| uid.to_string()),
                    _ => None,
                }
            })
            .collect();
        Ok(uids)
    }

    /// Returns the `gpg --fingerprint` output for `keyid`, verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`GpgError::NoPublicKey`] when gpg exits non-zero.
    pub fn fingerprint(&self, keyid: &str) -> GpgResult<String> {
        let args = [OsString::from("--fingerprint"), OsString::from(keyid)];
        let (exit, text) = self.run_batch(&args)?;
        if exit != 0 {
            return Err(GpgError::NoPublicKey);
        }
        Ok(text)
    }

    /// Reports how much `keyid`'s owner is trusted, decoded from the
    /// validity flag of the key's `pub` colon record.
    ///
    /// # Errors
    ///
    /// - [`GpgError::NoPublicKey`] when gpg exits non-zero
    /// - [`GpgError::Unexpected`] when no `pub` record with a known flag
    ///   shows up in the listing
    pub fn trust_level(&self, keyid: &str) -> GpgResult<TrustLevel> {
        let args = [
            OsString::from("--fixed-list-mode"),
            OsString::from("--with-colons"),
            OsString::from("--list-keys"),
            OsString::from(keyid),
        ];
        let (exit, text) = self.run_batch(&args)?;
        if exit != 0 {
            return Err(GpgError::NoPublicKey);
        }

        // The first pub record decides, even when its flag is unrecognized.
        let decoded = text.lines().find_map(|line| {
            let fields: Vec<&str> = line.split(':').collect();
            match fields.first() {
                Some(&"pub") => Some(
                    fields
                        .get(1)
                        .and_then(|flags| flags.chars().next())
                        .and_then(TrustLevel::from_record_flag),
                ),
                _ => None,
            }
        });
        match decoded {
            Some(Some(level)) => Ok(level),
            _ => Err(GpgError::Unexpected { status: text }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::test_config;
    use crate::session::testing::ScriptedSpawner;

    #[test]
    fn test_version_passes_flag_and_returns_text() {
        let banner = "gpg (GnuPG) 2.4.4\nlibgcrypt 1.10.3\n";
        let (spawner, log) = ScriptedSpawner::new(banner, 0);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));

        let version = driver.version().unwrap();
        assert!(version.contains("GnuPG"));
        assert_eq!(log.borrow().args, vec!["--version".to_string()]);
    }

    #[test]
    fn test_version_nonzero_exit_is_internal() {
        let (spawner, _log) = ScriptedSpawner::new("", 1);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));
        assert!(matches!(driver.version(), Err(GpgError::Internal(_))));
    }

    #[test]
    fn test_is_installed_missing_binary() {
        let mut config = test_config();
        config
            .set_directive(
                crate::config::DIRECTIVE_BINARY_PATH,
                "/nonexistent/gpgbridge-test-binary",
            )
            .unwrap();
        let (spawner, _log) = ScriptedSpawner::new("", 0);
        let driver = GpgDriver::with_spawner(config, Box::new(spawner));
        assert!(!driver.is_installed());
    }

    #[test]
    fn test_fetch_key_imports_fresh_key() {
        let status = "[GNUPG:] IMPORTED 2C157CF124CB0839 Alice Example <alice@example.org>\n";
        let (spawner, log) = ScriptedSpawner::new(status, 0);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));

        driver.fetch_key("24CB0839", None).unwrap();
        assert_eq!(
            log.borrow().args,
            vec!["--recv-key".to_string(), "24CB0839".to_string()]
        );
    }

    #[test]
    fn test_fetch_key_passes_keyserver() {
        let status = "[GNUPG:] IMPORTED 2C157CF124CB0839 Alice\n";
        let (spawner, log) = ScriptedSpawner::new(status, 0);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));

        driver
            .fetch_key("24CB0839", Some("hkps://keys.example.org"))
            .unwrap();
        assert_eq!(
            log.borrow().args,
            vec![
                "--keyserver".to_string(),
                "hkps://keys.example.org".to_string(),
                "--recv-key".to_string(),
                "24CB0839".to_string(),
            ]
        );
    }

    #[test]
    fn test_fetch_key_already_present() {
        let status = "[GNUPG:] IMPORT_OK 0 792836377D99F13F68B4D49B2C157CF124CB0839\n";
        let (spawner, _log) = ScriptedSpawner::new(status, 0);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));

        match driver.fetch_key("24CB0839", None) {
            Err(GpgError::KeyAlreadyPresent) => {}
            other => panic!("expected KeyAlreadyPresent, got {:?}", other),
        }
    }

    #[test]
    fn test_fetch_key_not_on_keyserver() {
        let status = "[GNUPG:] NODATA 1\n";
        let (spawner, _log) = ScriptedSpawner::new(status, 2);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));

        match driver.fetch_key("24CB0839", None) {
            Err(GpgError::NoPublicKey) => {}
            other => panic!("expected NoPublicKey, got {:?}", other),
        }
    }

    #[test]
    fn test_list_uids_picks_uid_records() {
        let listing = "tru::1:1253481296:1254345584:3:1:5\n\
             pub:u:1024:17:2C157CF124CB0839:2009-07-14:::u:::scaESCA\n\
             uid:u::::2009-07-14::AABB::Alice Example <alice@example.org>:\n\
             uid:u::::2009-07-15::CCDD::Alice (work) <alice@corp.example>:\n\
             fpr:::::::::792836377D99F13F68B4D49B2C157CF124CB0839:\n";
        let (spawner, _log) = ScriptedSpawner::new(listing, 0);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));

        let uids = driver.list_uids("24CB0839").unwrap();
        assert_eq!(
            uids,
            vec![
                "Alice Example <alice@example.org>".to_string(),
                "Alice (work) <alice@corp.example>".to_string(),
            ]
        );
    }

    #[test]
    fn test_list_uids_missing_key() {
        let (spawner, _log) = ScriptedSpawner::new("", 2);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));
        assert!(matches!(
            driver.list_uids("24CB0839"),
            Err(GpgError::NoPublicKey)
        ));
    }

    #[test]
    fn test_fingerprint_returns_raw_output() {
        let listing = "pub   1024D/24CB0839 2009-07-14\n      Key fingerprint = 7928 3637 7D99 F13F 68B4  D49B 2C15 7CF1 24CB 0839\n";
        let (spawner, _log) = ScriptedSpawner::new(listing, 0);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));

        let fingerprint = driver.fingerprint("24CB0839").unwrap();
        assert!(fingerprint.contains("Key fingerprint"));
    }

    #[test]
    fn test_trust_level_decodes_pub_record() {
        let cases = [
            ('u', TrustLevel::Ultimate),
            ('f', TrustLevel::Full),
            ('m', TrustLevel::Marginal),
            ('n', TrustLevel::Untrusted),
            ('q', TrustLevel::Unknown),
            ('-', TrustLevel::Unknown),
            ('e', TrustLevel::Expired),
            ('r', TrustLevel::Revoked),
            ('i', TrustLevel::Invalid),
        ];
        for (flag, expected) in cases {
            let listing = format!(
                "tru::1:1253481296:1254345584:3:1:5\npub:{}:1024:17:2C157CF124CB0839:2009-07-14:::u:::scaESCA\n",
                flag
            );
            let (spawner, _log) = ScriptedSpawner::new(&listing, 0);
            let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));
            assert_eq!(driver.trust_level("24CB0839").unwrap(), expected);
        }
    }

    #[test]
    fn test_trust_level_without_pub_record_is_unexpected() {
        let listing = "tru::1:1253481296:1254345584:3:1:5\n";
        let (spawner, _log) = ScriptedSpawner::new(listing, 0);
        let driver = GpgDriver::with_spawner(test_config(), Box::new(spawner));

        match driver.trust_level("24CB0839") {
            Err(GpgError::Unexpected { .. }) => {}
            other => panic!("expected Unexpected, got {:?}", other),
        }
    }
}
