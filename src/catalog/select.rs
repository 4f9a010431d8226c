//! Choosing which downloaded file to hand back, and in what shape.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use walkdir::WalkDir;

use super::acquire::{Downloader, COMPLETE_MARKER, PAYLOAD_EXTENSION};
use super::memory::{ensure_fits, MemoryProbe, SystemMemory};
use super::{FileEntry, Loaded, ResolvedMetadata};
use crate::error::KaggleEaseError;
use crate::table::{read_table, TableFormat};

/// Stem preferred when several tabular files remain.
const PREFERRED_STEM: &str = "train";

/// What to do with a resource once it is on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection<'a> {
    Parse {
        entry: &'a FileEntry,
        format: TableFormat,
    },
    RawPath,
}

/// Applies the selection policy to the resolved file list without touching the network.
pub fn select_entry<'a>(
    metadata: &'a ResolvedMetadata,
    file: Option<&str>,
) -> Result<Selection<'a>, KaggleEaseError> {
    if metadata.files.is_empty() {
        return Err(KaggleEaseError::data_format(format!(
            "{} '{}' lists no files",
            metadata.resource_kind, metadata.canonical_handle
        )));
    }

    if let Some(requested) = file {
        let entry = find_entry(&metadata.files, requested).ok_or_else(|| {
            KaggleEaseError::not_found(format!(
                "file '{}' is not part of '{}'",
                requested, metadata.canonical_handle
            ))
            .with_fix_suggestion(format!("available files: {}", file_names(&metadata.files)))
        })?;
        let format = entry.format().ok_or_else(|| {
            KaggleEaseError::unsupported_format(format!(
                "'{}' has type '{}', which cannot be loaded as a table",
                entry.name, entry.declared_type
            ))
            .with_fix_suggestion("omit file= to receive the download path instead")
        })?;
        return Ok(Selection::Parse { entry, format });
    }

    if let [only] = metadata.files.as_slice() {
        return Ok(match only.format() {
            Some(format) => Selection::Parse {
                entry: only,
                format,
            },
            None => Selection::RawPath,
        });
    }

    let candidates: Vec<(&FileEntry, TableFormat)> = metadata
        .files
        .iter()
        .filter(|entry| !is_auxiliary(entry))
        .filter_map(|entry| entry.format().map(|format| (entry, format)))
        .collect();

    match candidates.as_slice() {
        [] => Ok(Selection::RawPath),
        [(entry, format)] => Ok(Selection::Parse {
            entry: *entry,
            format: *format,
        }),
        several => {
            let preferred: Vec<_> = several
                .iter()
                .filter(|(entry, _)| stem(entry.base_name()).eq_ignore_ascii_case(PREFERRED_STEM))
                .collect();
            if let [(entry, format)] = preferred.as_slice() {
                return Ok(Selection::Parse {
                    entry: *entry,
                    format: *format,
                });
            }
            Err(KaggleEaseError::multiple_files(
                several.iter().map(|(entry, _)| entry.name.clone()).collect(),
            ))
        }
    }
}

/// Exact name, then case-insensitive name, then base name.
fn find_entry<'a>(files: &'a [FileEntry], requested: &str) -> Option<&'a FileEntry> {
    let requested = requested.trim();
    files
        .iter()
        .find(|entry| entry.name == requested)
        .or_else(|| {
            files
                .iter()
                .find(|entry| entry.name.eq_ignore_ascii_case(requested))
        })
        .or_else(|| {
            files
                .iter()
                .find(|entry| entry.base_name().eq_ignore_ascii_case(requested))
        })
}

fn is_auxiliary(entry: &FileEntry) -> bool {
    entry.base_name().to_ascii_lowercase().contains("submission")
}

fn stem(name: &str) -> &str {
    name.split_once('.').map_or(name, |(stem, _)| stem)
}

fn file_names(files: &[FileEntry]) -> String {
    files
        .iter()
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Finds the file for `entry` under a download root.
pub fn locate(root: &Path, entry: &FileEntry) -> Result<PathBuf, KaggleEaseError> {
    if root.is_file() {
        return Ok(root.to_path_buf());
    }

    let direct = root.join(&entry.name);
    if direct.is_file() {
        return Ok(direct);
    }

    let mut others = Vec::new();
    for walked in WalkDir::new(root).follow_links(true) {
        let walked = walked.map_err(|source| {
            KaggleEaseError::data_format(format!(
                "failed while traversing {}: {source}",
                root.display()
            ))
        })?;
        if !walked.file_type().is_file() || walked.file_name() == COMPLETE_MARKER {
            continue;
        }
        if walked
            .file_name()
            .to_string_lossy()
            .eq_ignore_ascii_case(entry.base_name())
        {
            return Ok(walked.into_path());
        }
        others.push(walked.into_path());
    }

    // An unarchived single-file download keeps its payload name.
    if let [only] = others.as_slice() {
        if only.extension().is_some_and(|ext| ext == PAYLOAD_EXTENSION) {
            debug!(file = %entry.name, payload = %only.display(), "reading unarchived payload");
            return Ok(only.clone());
        }
    }

    Err(KaggleEaseError::not_found(format!(
        "'{}' was listed by the catalog but is missing from {}",
        entry.name,
        root.display()
    )))
}

/// Downloads a resolved resource and turns it into a frame or a path.
pub struct FormatSelector {
    downloader: Arc<dyn Downloader>,
    memory: Arc<dyn MemoryProbe>,
}

impl FormatSelector {
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        Self {
            downloader,
            memory: Arc::new(SystemMemory),
        }
    }

    pub fn with_memory_probe(mut self, memory: Arc<dyn MemoryProbe>) -> Self {
        self.memory = memory;
        self
    }

    /// Checks free memory before any bytes are fetched.
    pub fn materialize(
        &self,
        metadata: &ResolvedMetadata,
        file: Option<&str>,
        timeout: Duration,
    ) -> Result<Loaded, KaggleEaseError> {
        let selection = select_entry(metadata, file)?;
        if let Selection::Parse { entry, .. } = selection {
            ensure_fits(entry, self.memory.as_ref())?;
        }
        let root = self.downloader.download(
            metadata.resource_kind,
            &metadata.canonical_handle,
            timeout,
        )?;

        match selection {
            Selection::RawPath => {
                debug!(handle = %metadata.canonical_handle, path = %root.display(), "returning download path");
                Ok(Loaded::Path(root))
            }
            Selection::Parse { entry, format } => {
                let path = locate(&root, entry)?;
                debug!(file = %entry.name, ?format, path = %path.display(), "parsing table");
                read_table(&path, format).map(Loaded::Frame)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceKind;
    use crate::error::ErrorKind;

    fn file(name: &str) -> FileEntry {
        let declared_type = name.rsplit('.').next().unwrap_or_default().to_string();
        FileEntry {
            name: name.to_string(),
            size_bytes: 10,
            declared_type,
        }
    }

    fn metadata(names: &[&str]) -> ResolvedMetadata {
        ResolvedMetadata {
            resource_kind: ResourceKind::Competition,
            canonical_handle: "titanic".into(),
            files: names.iter().map(|name| file(name)).collect(),
            total_size_bytes: 10 * names.len() as u64,
        }
    }

    fn parsed_name(selection: Selection<'_>) -> Option<String> {
        match selection {
            Selection::Parse { entry, .. } => Some(entry.name.clone()),
            Selection::RawPath => None,
        }
    }

    #[test]
    fn single_tabular_file_is_parsed() {
        let meta = metadata(&["data.tsv"]);
        let selection = select_entry(&meta, None).expect("select");
        assert_eq!(
            selection,
            Selection::Parse {
                entry: &meta.files[0],
                format: TableFormat::Tsv
            }
        );
    }

    #[test]
    fn single_non_tabular_file_is_a_path() {
        let meta = metadata(&["weights.bin"]);
        assert_eq!(select_entry(&meta, None).expect("select"), Selection::RawPath);
    }

    #[test]
    fn submissions_are_ignored() {
        let meta = metadata(&["sample_submission.csv", "train.csv"]);
        assert_eq!(
            parsed_name(select_entry(&meta, None).expect("select")),
            Some("train.csv".into())
        );
    }

    #[test]
    fn train_wins_among_several_tables() {
        let meta = metadata(&["train.csv", "test.csv", "gender_submission.csv"]);
        assert_eq!(
            parsed_name(select_entry(&meta, None).expect("select")),
            Some("train.csv".into())
        );
    }

    #[test]
    fn ambiguous_tables_list_candidates() {
        let meta = metadata(&["a.csv", "b.json", "c.png"]);
        let err = select_entry(&meta, None).expect_err("ambiguous");
        assert_eq!(err.kind(), ErrorKind::MultipleFiles);
        assert_eq!(err.candidates(), ["a.csv", "b.json"]);
    }

    #[test]
    fn archives_without_tables_are_paths() {
        let meta = metadata(&["images.zip", "labels.txt"]);
        assert_eq!(select_entry(&meta, None).expect("select"), Selection::RawPath);
    }

    #[test]
    fn explicit_file_matches_case_and_base_name() {
        let meta = metadata(&["data/Train.csv", "test.csv"]);
        assert_eq!(
            parsed_name(select_entry(&meta, Some("train.csv")).expect("select")),
            Some("data/Train.csv".into())
        );
        assert_eq!(
            parsed_name(select_entry(&meta, Some("DATA/TRAIN.CSV")).expect("select")),
            Some("data/Train.csv".into())
        );
    }

    #[test]
    fn explicit_missing_file_is_not_found() {
        let meta = metadata(&["train.csv", "test.csv"]);
        let err = select_entry(&meta, Some("valid.csv")).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::DatasetNotFound);
        assert_eq!(
            err.fix_suggestion(),
            Some("available files: train.csv, test.csv")
        );
    }

    #[test]
    fn explicit_non_tabular_file_is_unsupported() {
        let meta = metadata(&["train.csv", "images.zip"]);
        let err = select_entry(&meta, Some("images.zip")).expect_err("unsupported");
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        assert!(err.is_data_format());
    }

    #[test]
    fn empty_listing_is_a_format_error() {
        let meta = metadata(&[]);
        let err = select_entry(&meta, None).expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::DataFormat);
    }

    #[test]
    fn locate_walks_nested_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("titanic").join("csv");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(nested.join("train.csv"), "a\n1\n").expect("write");
        std::fs::write(nested.join("test.csv"), "a\n2\n").expect("write");
        std::fs::write(dir.path().join(COMPLETE_MARKER), "").expect("marker");

        let found = locate(dir.path(), &file("train.csv")).expect("found");
        assert_eq!(found, nested.join("train.csv"));

        let err = locate(dir.path(), &file("valid.csv")).expect_err("missing");
        assert_eq!(err.kind(), ErrorKind::DatasetNotFound);
    }

    #[test]
    fn locate_falls_back_to_the_only_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("iris.download"), "a\n1\n").expect("write");
        std::fs::write(dir.path().join(COMPLETE_MARKER), "").expect("marker");

        let found = locate(dir.path(), &file("iris.csv")).expect("found");
        assert_eq!(found, dir.path().join("iris.download"));
    }

    #[test]
    fn locate_does_not_substitute_a_differently_named_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("penguins.csv"), "a\n1\n").expect("write");
        std::fs::write(dir.path().join(COMPLETE_MARKER), "").expect("marker");

        let err = locate(dir.path(), &file("iris.csv")).expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::DatasetNotFound);
    }
}
