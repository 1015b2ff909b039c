//! Shared helpers for driving the crate against a fake gpg.
//!
//! The fake is a shell script that mimics the batch protocol: it consumes
//! the blank passphrase line from its stdin, optionally writes a result file
//! next to its last argument (the way gpg writes `<input>.asc` or the
//! `--output` target), prints canned status text, and exits with a fixed
//! status.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// What the fake gpg should do besides printing status text.
pub struct FakeGpg<'a> {
    pub status_text: &'a str,
    pub exit_code: i32,
    /// `(suffix, content)`: write `content` to `<last argument><suffix>`
    /// before exiting, the way gpg writes its result file.
    pub result_file: Option<(&'a str, &'a str)>,
}

impl<'a> FakeGpg<'a> {
    pub fn new(status_text: &'a str, exit_code: i32) -> Self {
        FakeGpg {
            status_text,
            exit_code,
            result_file: None,
        }
    }

    pub fn with_result_file(mut self, suffix: &'a str, content: &'a str) -> Self {
        self.result_file = Some((suffix, content));
        self
    }

    /// Writes the script into `dir` and returns its path.
    #[cfg(unix)]
    pub fn write(self, dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let mut script = String::from("#!/bin/sh\nIFS= read -r _passphrase\n");
        if let Some((suffix, content)) = self.result_file {
            script.push_str("for arg in \"$@\"; do last=\"$arg\"; done\n");
            script.push_str(&format!(
                "printf '%s' '{}' > \"${{last}}{}\"\n",
                shell_quote(content),
                suffix
            ));
        }
        script.push_str(&format!(
            "printf '%s' '{}'\nexit {}\n",
            shell_quote(self.status_text),
            self.exit_code
        ));

        let path = dir.join("fake-gpg.sh");
        fs::write(&path, script).expect("write fake gpg script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("make fake gpg executable");
        path
    }
}

/// Escapes single quotes for embedding in a single-quoted shell string.
fn shell_quote(text: &str) -> String {
    text.replace('\'', "'\\''")
}
