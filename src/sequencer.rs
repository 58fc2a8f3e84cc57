use std::{cmp::Ordering, path::PathBuf};

use tracing::{debug, info};

use crate::{
    checkpoint::StreamPosition,
    follow::{Follow, Selection},
    path_utils::{compare_names, is_compressed_form_of},
};

/// Follows an ordered, growing set of rotated files (`access.log.1`, `access.log.2`, ...)
///
/// Names are assumed to sort in rotation order. Without a checkpoint the sequencer starts at the newest file;
/// with one it resumes at the stored file and offset and then walks forward through every newer file, each drained
/// completely before the next one is opened.
///
/// ## Choosing the next file
///
/// While the current file is still the newest nothing moves. Once newer files appear, the sorted list is scanned:
///
/// * right after a restart, a name equal to the checkpointed one keeps the current file (resume in place)
/// * a name equal to the current one plus `.gz` keeps the current file, now read through the decompressor, at the
///   same offset
/// * otherwise the first name sorting after the current one becomes current, from offset 0
///
/// If nothing in the list qualifies, the sequencer steps one position past the previously used index.
#[derive(Debug)]
pub struct MultiFileSequencer {
    follow: Option<Follow>,
    index: usize,
    resuming: bool,
}

impl MultiFileSequencer {
    pub fn new(resume: Option<StreamPosition>) -> Self {
        match resume {
            Some(position) => {
                info!(
                    path = %position.filename.display(),
                    offset = position.bytes_consumed,
                    "resuming from checkpoint"
                );
                Self {
                    follow: Some(Follow::resume(position.filename, position.bytes_consumed)),
                    index: 0,
                    resuming: true,
                }
            }
            None => Self {
                follow: None,
                index: 0,
                resuming: false,
            },
        }
    }

    pub fn current(&self) -> Option<&Follow> {
        self.follow.as_ref()
    }

    /// Pick the file to drain on this pass from the freshly resolved, sorted `files`
    pub fn select(&mut self, files: &[PathBuf]) -> Option<Selection<'_>> {
        let newest = files.last()?;
        let resuming = std::mem::take(&mut self.resuming);

        let follow = match self.follow.take() {
            None => {
                info!(path = %newest.display(), "starting at newest file");
                self.index = files.len() - 1;
                Follow::start(newest.clone())
            }
            Some(follow) if follow.path() == newest.as_path() => {
                self.index = files.len() - 1;
                follow
            }
            Some(follow) => self.advance(follow, files, resuming),
        };

        let skip_wait = self.index < files.len() - 1;
        Some(Selection {
            follow: self.follow.insert(follow),
            skip_wait,
        })
    }

    fn advance(&mut self, mut follow: Follow, files: &[PathBuf], resuming: bool) -> Follow {
        let current = follow.path().to_path_buf();
        for (index, candidate) in files.iter().enumerate() {
            if (resuming && *candidate == current) || is_compressed_form_of(candidate, &current) {
                self.index = index;
                if *candidate != current {
                    debug!(path = %candidate.display(), "current file was compressed, continuing inside it");
                    follow.relocate(candidate.clone());
                }
                return follow;
            }
            if compare_names(candidate, &current) == Ordering::Greater {
                self.index = index;
                info!(
                    from = %current.display(),
                    to = %candidate.display(),
                    backlog = files.len() - 1 - index,
                    "advancing to next file"
                );
                follow.abandon();
                return Follow::start(candidate.clone());
            }
        }

        let index = (self.index + 1).min(files.len() - 1);
        self.index = index;
        let fallback = &files[index];
        debug!(
            current = %current.display(),
            fallback = %fallback.display(),
            "no successor by name, stepping by index"
        );
        if *fallback == current {
            follow
        } else {
            follow.abandon();
            Follow::start(fallback.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use rstest::rstest;

    use super::MultiFileSequencer;
    use crate::checkpoint::StreamPosition;

    fn files(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| Path::new("/logs").join(n)).collect()
    }

    /// Returns (selected file name, bytes consumed, skip_wait)
    fn pick(sequencer: &mut MultiFileSequencer, names: &[&str]) -> Option<(String, u64, bool)> {
        let files = files(names);
        sequencer.select(&files).map(|selection| {
            (
                selection
                    .follow
                    .path()
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned(),
                selection.follow.bytes_consumed(),
                selection.skip_wait,
            )
        })
    }

    fn consume(sequencer: &mut MultiFileSequencer, names: &[&str], bytes: usize) {
        let files = files(names);
        let follow = sequencer.select(&files).unwrap().follow;
        let assembled = follow.assemble(&vec![b'x'; bytes]);
        follow.commit(assembled);
    }

    fn resume_at(name: &str, offset: u64) -> MultiFileSequencer {
        MultiFileSequencer::new(Some(StreamPosition::new(Path::new("/logs").join(name), offset)))
    }

    #[test]
    fn empty_list_selects_nothing() {
        let mut sequencer = MultiFileSequencer::new(None);
        assert_eq!(pick(&mut sequencer, &[]), None);
    }

    #[test]
    fn fresh_start_takes_newest_only() {
        let mut sequencer = MultiFileSequencer::new(None);
        let all = ["app.log.1", "app.log.2", "app.log.3"];
        assert_eq!(
            pick(&mut sequencer, &all),
            Some(("app.log.3".into(), 0, false))
        );
        // steady state keeps position
        consume(&mut sequencer, &all, 42);
        assert_eq!(
            pick(&mut sequencer, &all),
            Some(("app.log.3".into(), 42, false))
        );
    }

    #[test]
    fn rotation_moves_to_next_name() {
        let mut sequencer = MultiFileSequencer::new(None);
        consume(&mut sequencer, &["app.log.1"], 100);
        assert_eq!(
            pick(&mut sequencer, &["app.log.1", "app.log.2"]),
            Some(("app.log.2".into(), 0, false))
        );
    }

    #[test]
    fn backlog_is_walked_with_skip_wait() {
        let mut sequencer = resume_at("app.log.1", 0);
        let all = ["app.log.1", "app.log.2", "app.log.3"];
        assert_eq!(
            pick(&mut sequencer, &all),
            Some(("app.log.1".into(), 0, true))
        );
        assert_eq!(
            pick(&mut sequencer, &all),
            Some(("app.log.2".into(), 0, true))
        );
        assert_eq!(
            pick(&mut sequencer, &all),
            Some(("app.log.3".into(), 0, false))
        );
    }

    #[test]
    fn resume_keeps_checkpoint_offset() {
        let mut sequencer = resume_at("app.log.1", 500);
        assert_eq!(
            pick(&mut sequencer, &["app.log.1", "app.log.2"]),
            Some(("app.log.1".into(), 500, true))
        );
    }

    #[rstest]
    #[case(&["app.log.1.gz", "app.log.2"], true)]
    #[case(&["app.log.1.gz"], false)]
    fn resume_into_compressed_form(#[case] names: &[&str], #[case] skip_wait: bool) {
        let mut sequencer = resume_at("app.log.1.gz", 500);
        assert_eq!(
            pick(&mut sequencer, names),
            Some(("app.log.1.gz".into(), 500, skip_wait))
        );
    }

    #[test]
    fn compression_of_current_file_keeps_offset() {
        let mut sequencer = MultiFileSequencer::new(None);
        consume(&mut sequencer, &["app.log.1"], 20);
        assert_eq!(
            pick(&mut sequencer, &["app.log.1.gz", "app.log.2"]),
            Some(("app.log.1.gz".into(), 20, true))
        );
        // the compressed file is done once it is no longer the newest
        assert_eq!(
            pick(&mut sequencer, &["app.log.1.gz", "app.log.2"]),
            Some(("app.log.2".into(), 0, false))
        );
    }

    #[test]
    fn equal_name_is_skipped_outside_recovery() {
        let mut sequencer = MultiFileSequencer::new(None);
        consume(&mut sequencer, &["app.log.2"], 10);
        assert_eq!(
            pick(&mut sequencer, &["app.log.1", "app.log.2", "app.log.3"]),
            Some(("app.log.3".into(), 0, false))
        );
    }

    #[test]
    fn checkpointed_file_gone_moves_to_first_newer() {
        let mut sequencer = resume_at("app.log.1", 300);
        assert_eq!(
            pick(&mut sequencer, &["app.log.2", "app.log.3"]),
            Some(("app.log.2".into(), 0, true))
        );
    }

    #[test]
    fn no_successor_falls_back_to_index() {
        let mut sequencer = resume_at("app.log.9", 300);
        assert_eq!(
            pick(&mut sequencer, &["app.log.1", "app.log.2"]),
            Some(("app.log.2".into(), 0, false))
        );
    }
}
