//! End-to-end driver tests against a fake gpg subprocess.
//!
//! These exercise the real spawner: pipes, the blank passphrase line, the
//! stream drain, and exit-status handling, with a shell script standing in
//! for gpg. Unix only; the scripted-session unit tests cover the operation
//! logic everywhere else.

#![cfg(unix)]

mod common;

use common::FakeGpg;
use gpgbridge::config::{DIRECTIVE_BINARY_PATH, DIRECTIVE_INITIALIZED};
use gpgbridge::{GpgConfig, GpgDriver, GpgError, TrustLevel};
use std::path::Path;

fn driver_for(script: &Path) -> GpgDriver {
    let mut config = GpgConfig::default();
    config
        .set_directive(DIRECTIVE_BINARY_PATH, script.to_str().unwrap())
        .unwrap();
    config.set_directive(DIRECTIVE_INITIALIZED, "true").unwrap();
    GpgDriver::new(config)
}

#[test]
fn version_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new("gpg (GnuPG) 2.4.4\nlibgcrypt 1.10.3\n", 0).write(dir.path());

    let version = driver_for(&script).version().unwrap();
    assert!(version.contains("GnuPG"));
}

#[test]
fn verify_reports_signer_and_trust() {
    let status = "[GNUPG:] SIG_ID zfbsbRvH9ylP1xK1wApNqj56WR8 2009-07-16 1247743312\n\
         [GNUPG:] GOODSIG 2C157CF124CB0839 Alice Example <alice@example.org>\n\
         [GNUPG:] VALIDSIG 792836377D99F13F68B4D49B2C157CF124CB0839 2009-07-16 1247743312 0 3 0 17 2 00 792836377D99F13F68B4D49B2C157CF124CB0839\n\
         [GNUPG:] TRUST_ULTIMATE\n";
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new(status, 0).write(dir.path());

    let info = driver_for(&script)
        .verify("-----BEGIN PGP SIGNED MESSAGE-----\nhello\n", "")
        .unwrap();
    assert_eq!(info.signer, "Alice Example <alice@example.org>");
    assert_eq!(info.trust_level, TrustLevel::Ultimate);
}

#[test]
fn verify_bad_signature_maps_cleanly() {
    let status = "[GNUPG:] BADSIG 2C157CF124CB0839 Alice Example <alice@example.org>\n";
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new(status, 2).write(dir.path());

    match driver_for(&script).verify("tampered", "") {
        Err(GpgError::BadSignature) => {}
        other => panic!("expected BadSignature, got {:?}", other),
    }
}

#[test]
fn encrypt_reads_result_file_written_by_the_tool() {
    let status = "[GNUPG:] BEGIN_ENCRYPTION 2 9\n[GNUPG:] END_ENCRYPTION\n";
    let cipher = "-----BEGIN PGP MESSAGE-----\nhQEMA...\n-----END PGP MESSAGE-----\n";
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new(status, 0)
        .with_result_file(".asc", cipher)
        .write(dir.path());

    let recipients = vec!["24CB0839".to_string()];
    let out = driver_for(&script)
        .encrypt("hello", &recipients, &[], false, None)
        .unwrap();
    assert_eq!(out, cipher);
}

#[test]
fn encrypt_untrusted_recipient_maps_cleanly() {
    let status = "[GNUPG:] INV_RECP 10 3592D514\n";
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new(status, 2).write(dir.path());

    let recipients = vec!["3592D514".to_string()];
    match driver_for(&script).encrypt("hello", &recipients, &[], false, None) {
        Err(GpgError::PublicKeyNotTrusted) => {}
        other => panic!("expected PublicKeyNotTrusted, got {:?}", other),
    }
}

#[test]
fn sign_with_missing_secret_key_gives_no_output() {
    // gpg produces no status lines at all in this case; the driver keys off
    // the empty capture plus the non-zero exit.
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new("", 2).write(dir.path());

    match driver_for(&script).sign("payload", "24CB0839", false) {
        Err(GpgError::NoSecretKey) => {}
        other => panic!("expected NoSecretKey, got {:?}", other),
    }
}

#[test]
fn decrypt_round_trip_with_result_file() {
    let status = "[GNUPG:] ENC_TO D7974AEBC4DC6340 16 0\n\
         [GNUPG:] USERID_HINT D7974AEBC4DC6340 Alice Example <alice@example.org>\n\
         [GNUPG:] NEED_PASSPHRASE D7974AEBC4DC6340 2C157CF124CB0839 16 0\n\
         [GNUPG:] GOOD_PASSPHRASE\n\
         [GNUPG:] BEGIN_DECRYPTION\n\
         [GNUPG:] PLAINTEXT 62 1253809952 test\n\
         [GNUPG:] PLAINTEXT_LENGTH 4\n\
         [GNUPG:] DECRYPTION_OKAY\n\
         [GNUPG:] GOODMDC\n\
         [GNUPG:] END_DECRYPTION\n";
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new(status, 0)
        .with_result_file(".plain", "the plaintext\n")
        .write(dir.path());

    let out = driver_for(&script).decrypt("cipher text").unwrap();
    assert_eq!(out.plaintext, "the plaintext\n");
    assert!(out.signer.is_none());
    assert!(out.trust_level.is_none());
}

#[test]
fn decrypt_without_secret_key_maps_cleanly() {
    let status = "[GNUPG:] ENC_TO D7974AEBC4DC6340 16 0\n[GNUPG:] DECRYPTION_FAILED\n";
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new(status, 2).write(dir.path());

    match driver_for(&script).decrypt("cipher text") {
        Err(GpgError::NoSecretKey) => {}
        other => panic!("expected NoSecretKey, got {:?}", other),
    }
}

#[test]
fn fetch_key_fresh_import_succeeds() {
    let status = "[GNUPG:] IMPORTED 2C157CF124CB0839 Alice Example <alice@example.org>\n";
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new(status, 0).write(dir.path());

    driver_for(&script).fetch_key("24CB0839", None).unwrap();
}

#[test]
fn spawn_failure_is_internal_not_a_panic() {
    let mut config = GpgConfig::default();
    config
        .set_directive(DIRECTIVE_BINARY_PATH, "/nonexistent/gpgbridge-it-binary")
        .unwrap();
    config.set_directive(DIRECTIVE_INITIALIZED, "true").unwrap();

    match GpgDriver::new(config).version() {
        Err(GpgError::Internal(message)) => assert!(message.contains("failed to spawn")),
        other => panic!("expected Internal, got {:?}", other),
    }
}

#[test]
fn is_installed_sees_the_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = FakeGpg::new("", 0).write(dir.path());
    assert!(driver_for(&script).is_installed());
}
