//! Letters waiting for the resident, one file each.
//!
//! ```text
//! <root>/<agent_id>/unread/*.txt
//! ```
//!
//! Only the count matters to the session; reading letters is up to tools.

use dwell::agent::notify::{Inbox, InboxFuture};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

pub struct LetterBox {
    root: PathBuf,
}

impl LetterBox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding an agent's unread letters.
    pub fn unread_dir(&self, agent_id: &str) -> PathBuf {
        self.root.join(agent_id).join("unread")
    }
}

impl Inbox for LetterBox {
    fn unread_count<'a>(&'a self, agent_id: &'a str) -> InboxFuture<'a> {
        Box::pin(async move {
            let dir = self.unread_dir(agent_id);
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
                Err(e) => return Err(format!("cannot read {}: {e}", dir.display())),
            };

            let mut count = 0;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| format!("cannot read {}: {e}", dir.display()))?
            {
                let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
                let hidden = entry.file_name().to_string_lossy().starts_with('.');
                if is_file && !hidden {
                    count += 1;
                }
            }
            trace!("{count} unread letter(s) in {}", dir.display());
            Ok(count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_directory_means_no_mail() {
        let tmp = tempfile::tempdir().unwrap();
        let letters = LetterBox::new(tmp.path());
        assert_eq!(letters.unread_count("resident").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn counts_visible_files_only() {
        let tmp = tempfile::tempdir().unwrap();
        let letters = LetterBox::new(tmp.path());
        let dir = letters.unread_dir("resident");
        std::fs::create_dir_all(dir.join("drafts")).unwrap();
        std::fs::write(dir.join("from-ada.txt"), "Hello!").unwrap();
        std::fs::write(dir.join("from-bo.txt"), "Hi.").unwrap();
        std::fs::write(dir.join(".DS_Store"), "").unwrap();

        assert_eq!(letters.unread_count("resident").await.unwrap(), 2);
    }
}
