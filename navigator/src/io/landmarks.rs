//! Landmark catalog file: one `<Name words...> <X> <Y>` record per line.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use tracing::debug;

use crate::core::types::{Coord, LandmarkCatalog};

static RECORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>.*?\S)\s+(?P<x>\d+)\s+(?P<y>\d+)$").expect("landmark record regex")
});

/// Read and parse the catalog at `path`.
pub fn load_catalog(path: &Path) -> Result<LandmarkCatalog> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read landmarks {}", path.display()))?;
    let catalog = parse_catalog(&contents)
        .with_context(|| format!("parse landmarks {}", path.display()))?;
    debug!(path = %path.display(), landmarks = catalog.len(), "landmark catalog loaded");
    Ok(catalog)
}

/// Parse catalog records. Blank lines are skipped; names are normalised to
/// single spaces between words.
pub fn parse_catalog(contents: &str) -> Result<LandmarkCatalog> {
    let mut catalog = LandmarkCatalog::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let caps = RECORD_RE
            .captures(line)
            .ok_or_else(|| anyhow!("line {}: expected `<name> <x> <y>`, got {line:?}", idx + 1))?;
        let name = caps["name"].split_whitespace().collect::<Vec<_>>().join(" ");
        let x = parse_axis(&caps["x"], idx)?;
        let y = parse_axis(&caps["y"], idx)?;
        if catalog.insert(name.clone(), Coord::new(x, y)).is_some() {
            bail!("line {}: duplicate landmark {name:?}", idx + 1);
        }
    }
    Ok(catalog)
}

fn parse_axis(digits: &str, idx: usize) -> Result<i64> {
    digits
        .parse()
        .with_context(|| format!("line {}: coordinate {digits} is out of range", idx + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_word_names() {
        let catalog =
            parse_catalog("Independence Square 245 161\nOld   Mill 3 9\n\n").expect("parse");
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get("Independence Square"),
            Some(Coord::new(245, 161))
        );
        assert_eq!(catalog.get("Old Mill"), Some(Coord::new(3, 9)));
    }

    #[test]
    fn names_may_contain_digits_before_the_coordinates() {
        let catalog = parse_catalog("Pier 39 12 40").expect("parse");
        assert_eq!(catalog.get("Pier 39"), Some(Coord::new(12, 40)));
    }

    #[test]
    fn missing_coordinates_are_an_error() {
        let err = parse_catalog("Square 5").expect_err("invalid");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn negative_coordinates_are_an_error() {
        assert!(parse_catalog("Square -5 3").is_err());
    }

    #[test]
    fn duplicate_names_are_an_error() {
        let err = parse_catalog("Square 0 5\nSquare 1 1").expect_err("duplicate");
        assert!(err.to_string().contains("duplicate landmark"));
    }

    #[test]
    fn load_reports_path_on_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("landmarks.txt");
        let err = load_catalog(&path).expect_err("missing");
        assert!(err.to_string().contains("landmarks.txt"));
    }
}
