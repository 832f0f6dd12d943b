use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;
use wizard_maze_core::{LayoutError, MazeLayout};

/// Errors raised while loading a level file.
#[derive(Debug, Error)]
pub enum LevelLoadError {
    /// The level file could not be read.
    #[error("failed to read level file `{path}`")]
    Io {
        /// Path of the level file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The level text did not describe a usable grid.
    #[error("level file `{path}` is not a valid maze")]
    Layout {
        /// Path of the level file.
        path: PathBuf,
        /// Layout construction failure.
        #[source]
        source: LayoutError,
    },
}

/// Parses level text: one line per row, one wall digit per cell.
///
/// Blank lines and lines starting with `--` are skipped. Characters that are
/// not digits read as open cells.
pub fn parse_level(name: &str, contents: &str) -> Result<MazeLayout, LayoutError> {
    let rows: Vec<Vec<u8>> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--"))
        .map(|line| {
            line.chars()
                .map(|cell| {
                    cell.to_digit(10)
                        .and_then(|digit| u8::try_from(digit).ok())
                        .unwrap_or(0)
                })
                .collect()
        })
        .collect();
    MazeLayout::from_rows(name, &rows)
}

/// Loads a level file, naming the layout after the file stem.
pub fn load_level(path: &Path) -> Result<MazeLayout, LevelLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LevelLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_owned());
    parse_level(&name, &contents).map_err(|source| LevelLoadError::Layout {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a level file, substituting the open fallback grid on failure.
#[must_use]
pub fn load_level_or_fallback(path: &Path) -> MazeLayout {
    match load_level(path) {
        Ok(layout) => layout,
        Err(error) => {
            log::error!("{error}; substituting the fallback maze");
            MazeLayout::fallback()
        }
    }
}

/// Loads every `.txt` level in a directory in natural order (`Level2` before `Level10`).
///
/// An unreadable directory or one without levels yields the fallback grid.
#[must_use]
pub fn load_levels_from_dir(directory: &Path) -> Vec<MazeLayout> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(error) => {
            log::error!(
                "failed to list level directory {}: {error}; substituting the fallback maze",
                directory.display()
            );
            return vec![MazeLayout::fallback()];
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|extension| extension == "txt"))
        .collect();
    paths.sort_by_key(|path| natural_key(path));

    let levels: Vec<MazeLayout> = paths
        .iter()
        .filter_map(|path| match load_level(path) {
            Ok(layout) => Some(layout),
            Err(error) => {
                log::warn!("skipping level: {error}");
                None
            }
        })
        .collect();

    if levels.is_empty() {
        log::error!(
            "no usable levels in {}; substituting the fallback maze",
            directory.display()
        );
        return vec![MazeLayout::fallback()];
    }
    log::info!("loaded {} levels from {}", levels.len(), directory.display());
    levels
}

fn natural_key(path: &Path) -> (String, u64) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let split = stem
        .char_indices()
        .rev()
        .take_while(|(_, character)| character.is_ascii_digit())
        .last()
        .map_or(stem.len(), |(index, _)| index);
    let (prefix, digits) = stem.split_at(split);
    (prefix.to_owned(), digits.parse().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::{natural_key, parse_level};
    use std::path::Path;
    use wizard_maze_core::{CellCoord, WallMask};

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let layout = parse_level("demo", "-- header\n\n310\n0x2\n").expect("valid level");
        assert_eq!(layout.width(), 3);
        assert_eq!(layout.height(), 2);
        assert_eq!(layout.mask(CellCoord::new(0, 0)), Some(WallMask::from_bits(3)));
        assert_eq!(layout.mask(CellCoord::new(1, 1)), Some(WallMask::OPEN));
        assert_eq!(layout.name(), "demo");
    }

    #[test]
    fn comment_only_text_is_rejected() {
        assert!(parse_level("empty", "-- nothing here\n").is_err());
    }

    #[test]
    fn numbered_levels_sort_naturally() {
        let mut names = vec!["Level10.txt", "Level2.txt", "Level1.txt"];
        names.sort_by_key(|name| natural_key(Path::new(name)));
        assert_eq!(names, vec!["Level1.txt", "Level2.txt", "Level10.txt"]);
    }
}
