//! Local archive — one timestamped plain-text file per processed message.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Filesystem-reserved characters replaced in filenames.
const RESERVED: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Archive directory handle.
pub struct Archive {
    dir: PathBuf,
}

impl Archive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the archive directory if it does not exist.
    pub fn ensure_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// Write one archive file for a processed message and return its path.
    ///
    /// The filename combines a second-resolution timestamp with the
    /// sanitized subject; a collision within the same second for the same
    /// subject silently overwrites.
    pub fn store(&self, sender: &str, subject: &str, body: &str) -> std::io::Result<PathBuf> {
        self.store_at(Local::now(), sender, subject, body)
    }

    fn store_at(
        &self,
        at: DateTime<Local>,
        sender: &str,
        subject: &str,
        body: &str,
    ) -> std::io::Result<PathBuf> {
        let filename = format!(
            "{}_{}.txt",
            at.format("%Y%m%d_%H%M%S"),
            sanitize_subject(subject)
        );
        let path = self.dir.join(filename);

        let mut file = std::fs::File::create(&path)?;
        write!(file, "From: {sender}\nSubject: {subject}\n\n{body}")?;
        Ok(path)
    }
}

/// Replace filesystem-reserved characters (`\ / * ? : " < > |`) in a
/// subject with underscores.
pub fn sanitize_subject(subject: &str) -> String {
    subject
        .chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_each_reserved_char() {
        assert_eq!(
            sanitize_subject(r#"a\b/c*d?e:f"g<h>i|j"#),
            "a_b_c_d_e_f_g_h_i_j"
        );
    }

    #[test]
    fn sanitize_leaves_ordinary_subjects_alone() {
        assert_eq!(sanitize_subject("Quarterly report (draft)"), "Quarterly report (draft)");
    }

    #[test]
    fn sanitized_names_never_contain_reserved_chars() {
        let out = sanitize_subject("Invoice 3/4: *final* draft?");
        assert!(!out.contains(|c| RESERVED.contains(&c)));
    }

    #[test]
    fn store_writes_headers_and_body() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = Archive::new(tmp.path());

        let path = archive
            .store("alice@example.com", "Help", "Need help")
            .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();

        assert!(content.contains("From: alice@example.com"));
        assert!(content.contains("Subject: Help"));
        assert!(content.ends_with("\n\nNeed help"));
    }

    #[test]
    fn store_filename_is_timestamp_plus_subject() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = Archive::new(tmp.path());

        let at = "2026-08-29T10:30:05+00:00"
            .parse::<DateTime<Local>>()
            .unwrap();
        let path = archive.store_at(at, "a@b.c", "Status: update", "body").unwrap();

        let name = path.file_name().unwrap().to_string_lossy();
        assert_eq!(
            name,
            format!("{}_Status_ update.txt", at.format("%Y%m%d_%H%M%S"))
        );
    }

    #[test]
    fn same_second_same_subject_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = Archive::new(tmp.path());
        let at = Local::now();

        let first = archive.store_at(at, "a@b.c", "Dup", "one").unwrap();
        let second = archive.store_at(at, "a@b.c", "Dup", "two").unwrap();

        assert_eq!(first, second);
        assert!(std::fs::read_to_string(&second).unwrap().ends_with("two"));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
