//! Source unit discovery: list the source directory and derive one unit per file.

use crate::error::BuildError;
use crate::models::SourceUnit;
use std::fs;
use std::path::Path;

/// List `dir` and return its source units sorted by raw filename.
///
/// Only filenames are read. A listing failure is the driver's one fatal
/// error; non-UTF-8 names are converted lossily instead of failing.
pub fn discover_units(dir: &Path) -> Result<Vec<SourceUnit>, BuildError> {
    let unreadable = |source| BuildError::SourceDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut file_names = Vec::new();
    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        file_names.push(entry.file_name().to_string_lossy().into_owned());
    }

    log::debug!("Listed {} entries in {}", file_names.len(), dir.display());
    Ok(units_from_file_names(file_names))
}

/// Sort filenames lexicographically and derive units from them.
///
/// Names whose derived unit name is empty (dotfiles such as `.gitkeep`)
/// are skipped; indices are assigned after skipping.
pub fn units_from_file_names<I>(file_names: I) -> Vec<SourceUnit>
where
    I: IntoIterator<Item = String>,
{
    let mut file_names: Vec<String> = file_names.into_iter().collect();
    file_names.sort();

    file_names
        .into_iter()
        .filter(|file_name| {
            let keep = !crate::models::unit_name(file_name).is_empty();
            if !keep {
                log::warn!("Skipping '{}': derived unit name is empty", file_name);
            }
            keep
        })
        .enumerate()
        .map(|(index, file_name)| SourceUnit::from_file_name(&file_name, index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn names(units: &[SourceUnit]) -> Vec<&str> {
        units.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn test_discover_sorted_units() {
        let temp_dir = TempDir::new().unwrap();
        for file in ["c.rs", "a.rs", "b.rs"] {
            File::create(temp_dir.path().join(file)).unwrap();
        }

        let units = discover_units(temp_dir.path()).unwrap();
        assert_eq!(names(&units), vec!["a", "b", "c"]);
        assert_eq!(units[2].file_name, "c.rs");
        assert_eq!(units[2].index, 2);
    }

    #[test]
    fn test_discover_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        assert!(discover_units(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_discover_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("bin");

        match discover_units(&missing) {
            Err(BuildError::SourceDirUnreadable { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected SourceDirUnreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_sort_is_lexicographic_not_numeric() {
        let units = units_from_file_names(vec!["b2.rs".to_string(), "b10.rs".to_string()]);
        assert_eq!(names(&units), vec!["b10", "b2"]);
    }

    #[test]
    fn test_filename_without_dot() {
        let units = units_from_file_names(vec!["noext".to_string()]);
        assert_eq!(names(&units), vec!["noext"]);
    }

    #[test]
    fn test_dotfile_skipped_and_indices_dense() {
        let units = units_from_file_names(vec![
            ".gitkeep".to_string(),
            "01store.rs".to_string(),
            "00power.rs".to_string(),
        ]);
        assert_eq!(names(&units), vec!["00power", "01store"]);
        assert_eq!(units[0].index, 0);
        assert_eq!(units[1].index, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_filename_converted_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        File::create(temp_dir.path().join(OsStr::from_bytes(b"\xffbad.rs"))).unwrap();
        File::create(temp_dir.path().join("good.rs")).unwrap();

        let units = discover_units(temp_dir.path()).unwrap();
        assert_eq!(names(&units), vec!["good", "\u{FFFD}bad"]);
        assert_eq!(units[1].file_name, "\u{FFFD}bad.rs");
    }

    proptest! {
        #[test]
        fn prop_units_follow_sorted_filenames(files in prop::collection::vec("[a-z0-9]{1,8}(\\.[a-z]{1,3})?", 0..20)) {
            let units = units_from_file_names(files.clone());
            let mut sorted = files;
            sorted.sort();

            prop_assert_eq!(units.len(), sorted.len());
            for (i, (unit, file_name)) in units.iter().zip(sorted.iter()).enumerate() {
                prop_assert_eq!(unit.index, i);
                prop_assert_eq!(&unit.file_name, file_name);
                prop_assert!(!unit.name.contains('.'));
                prop_assert!(file_name.starts_with(&unit.name));
            }
        }
    }
}
