//! Finds input files under a directory tree.

use crate::errors::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn find_files<P, F>(dir: P, matches: F) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    F: Fn(&str) -> bool,
{
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        let wanted = entry.file_type().is_file() && entry.file_name().to_str().map_or(false, &matches);
        if wanted {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// All files under `dir` whose name starts with `prefix`, in walk order.
pub fn find_files_prefix<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<Vec<PathBuf>> {
    find_files(dir, |name| name.starts_with(prefix))
}

/// All files under `dir` whose name ends with `suffix`, in walk order.
pub fn find_files_suffix<P: AsRef<Path>>(dir: P, suffix: &str) -> Result<Vec<PathBuf>> {
    find_files(dir, |name| name.ends_with(suffix))
}

/// Groups event files by their parent directory, which identifies the run.
/// Files of a run keep their name order, which is the order they were
/// written since event file names embed a timestamp.
pub fn group_by_run(files: Vec<PathBuf>) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut runs = BTreeMap::new();
    for file in files {
        let run = file.parent().map(Path::to_path_buf).unwrap_or_default();
        runs.entry(run).or_insert_with(Vec::new).push(file);
    }
    for files in runs.values_mut() {
        files.sort();
    }
    runs
}

/// File name of `path` as text, empty if it has none.
pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    #[test]
    fn finds_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let run_a = dir.path().join("z1_tp1_pp1_dp8_sp1_mbsz4_run");
        let run_b = dir.path().join("nested").join("z1_tp2_pp1_dp4_sp1_mbsz4_run");
        fs::create_dir_all(&run_a).unwrap();
        fs::create_dir_all(&run_b).unwrap();
        File::create(run_a.join("events.out.tfevents.2.host")).unwrap();
        File::create(run_a.join("events.out.tfevents.1.host")).unwrap();
        File::create(run_b.join("events.out.tfevents.1.host")).unwrap();
        File::create(run_b.join("notes.csv")).unwrap();

        let events = find_files_prefix(dir.path(), "events.out.tfevents").unwrap();
        assert_eq!(events.len(), 3);
        let csvs = find_files_suffix(dir.path(), ".csv").unwrap();
        assert_eq!(csvs, vec![run_b.join("notes.csv")]);

        let runs = group_by_run(events);
        assert_eq!(runs.len(), 2);
        assert_eq!(
            runs[&run_a],
            vec![run_a.join("events.out.tfevents.1.host"), run_a.join("events.out.tfevents.2.host")]
        );
    }

    #[test]
    fn missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_files_suffix(dir.path().join("absent"), ".csv").is_err());
    }
}
