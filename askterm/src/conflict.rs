//! Interactive resolution of a file-write name collision.
//!
//! The user may overwrite, or name one alternative. A second collision
//! aborts the whole file action; there is no further retry.

use std::path::Path;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::core::path::{expand_home, retry_path};
use crate::core::types::FileOutcome;
use crate::io::console::{Console, Style};
use crate::io::files::{self, CreateOutcome};

pub struct ConflictResolver<'a> {
    console: &'a mut dyn Console,
    home: Option<&'a Path>,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(console: &'a mut dyn Console, home: Option<&'a Path>) -> Self {
        Self { console, home }
    }

    /// `existing` is known to exist; write `content` there or to one
    /// user-supplied alternative.
    pub fn resolve(&mut self, existing: &Path, content: &str) -> Result<FileOutcome> {
        let question = format!("The file {} already exists. Overwrite it?", existing.display());
        if self.console.confirm(&question)? {
            return Ok(match files::overwrite(existing, content) {
                Ok(()) => {
                    info!(path = %existing.display(), "overwrote after confirmation");
                    FileOutcome::Written(existing.to_path_buf())
                }
                Err(err) => {
                    error!(err = %err, "overwrite failed");
                    FileOutcome::Failed(format!("{err:#}"))
                }
            });
        }

        self.console
            .output("Enter a new name for the file:", Style::Action);
        let name = match self.console.read_line()? {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                info!("no alternative name given");
                return Ok(FileOutcome::Aborted);
            }
        };

        let name = expand_home(name.trim(), self.home);
        let parent = existing.parent().unwrap_or_else(|| Path::new(""));
        let name_is_dir = parent.join(&name).is_dir();
        let target = retry_path(existing, &name, name_is_dir);

        if let Err(err) = files::ensure_parent(&target) {
            error!(err = %err, "could not create parent directories");
            return Ok(FileOutcome::Failed(format!("{err:#}")));
        }
        match files::write_new(&target, content) {
            Ok(CreateOutcome::Created) => {
                info!(path = %target.display(), "wrote file under new name");
                Ok(FileOutcome::Written(target))
            }
            Ok(CreateOutcome::AlreadyExists) => {
                warn!(path = %target.display(), "alternative name also exists");
                self.console.output(
                    &format!(
                        "{} also exists. The file was not saved; ask me again to retry.",
                        target.display()
                    ),
                    Style::Error,
                );
                Ok(FileOutcome::Aborted)
            }
            Err(err) => {
                error!(err = %err, "file write failed");
                Ok(FileOutcome::Failed(format!("{err:#}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::io::console::{NO, YES};
    use crate::test_support::ScriptedConsole;

    #[test]
    fn confirmed_overwrite_replaces_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("notes.txt");
        fs::write(&path, "old").expect("seed");
        let mut console = ScriptedConsole::new().with_choices([YES]);

        let outcome = ConflictResolver::new(&mut console, None)
            .resolve(&path, "new")
            .expect("resolve");

        assert_eq!(outcome, FileOutcome::Written(path.clone()));
        assert_eq!(fs::read_to_string(&path).expect("read"), "new");
    }

    #[test]
    fn declined_overwrite_writes_alternative_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("notes.txt");
        fs::write(&path, "old").expect("seed");
        let mut console = ScriptedConsole::new()
            .with_choices([NO])
            .with_lines(["notes2.txt"]);

        let outcome = ConflictResolver::new(&mut console, None)
            .resolve(&path, "hi")
            .expect("resolve");

        let renamed = temp.path().join("notes2.txt");
        assert_eq!(outcome, FileOutcome::Written(renamed.clone()));
        assert_eq!(fs::read_to_string(renamed).expect("read"), "hi");
        assert_eq!(fs::read_to_string(&path).expect("read"), "old");
    }

    #[test]
    fn name_without_extension_inherits_original() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("notes.txt");
        fs::write(&path, "old").expect("seed");
        let mut console = ScriptedConsole::new()
            .with_choices([NO])
            .with_lines(["backup"]);

        let outcome = ConflictResolver::new(&mut console, None)
            .resolve(&path, "hi")
            .expect("resolve");

        assert_eq!(outcome, FileOutcome::Written(temp.path().join("backup.txt")));
    }

    #[test]
    fn directory_name_keeps_original_file_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("notes.txt");
        fs::write(&path, "old").expect("seed");
        fs::create_dir(temp.path().join("archive")).expect("mkdir");
        let mut console = ScriptedConsole::new()
            .with_choices([NO])
            .with_lines(["archive"]);

        let outcome = ConflictResolver::new(&mut console, None)
            .resolve(&path, "hi")
            .expect("resolve");

        assert_eq!(
            outcome,
            FileOutcome::Written(temp.path().join("archive/notes.txt"))
        );
    }

    #[test]
    fn second_collision_aborts_and_keeps_both_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("notes.txt");
        let other = temp.path().join("notes2.txt");
        fs::write(&path, "old").expect("seed");
        fs::write(&other, "other").expect("seed");
        let mut console = ScriptedConsole::new()
            .with_choices([NO])
            .with_lines(["notes2.txt"]);

        let outcome = ConflictResolver::new(&mut console, None)
            .resolve(&path, "hi")
            .expect("resolve");

        assert_eq!(outcome, FileOutcome::Aborted);
        assert_eq!(fs::read_to_string(&path).expect("read"), "old");
        assert_eq!(fs::read_to_string(&other).expect("read"), "other");
    }

    #[test]
    fn blank_name_aborts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("notes.txt");
        fs::write(&path, "old").expect("seed");
        let mut console = ScriptedConsole::new().with_choices([NO]).with_lines([""]);

        let outcome = ConflictResolver::new(&mut console, None)
            .resolve(&path, "hi")
            .expect("resolve");

        assert_eq!(outcome, FileOutcome::Aborted);
    }
}
