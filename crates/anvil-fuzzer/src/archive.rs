//! JSON persistence of fuzzing results.
//!
//! The archive is an array of pattern records, each carrying its components,
//! the flat slot vector, and every address mapping probed with it (including
//! observed bit flips and reproducibility scores). The schema is append-only
//! across versions: fields are added, never renamed or removed, so archives
//! from older runs stay loadable.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::pattern::HammeringPattern;

/// Errors while writing or reading an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// I/O error on the archive file
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// No pattern in the archive has the requested id
    #[error("no pattern with id {0} in archive")]
    PatternNotFound(String),
}

/// Writes all patterns (with their mappings and bit flips) to `path`.
///
/// # Errors
///
/// [`ArchiveError::Io`] / [`ArchiveError::Json`] on failure.
pub fn export_patterns(path: &Path, patterns: &[HammeringPattern]) -> Result<(), ArchiveError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), patterns)?;
    info!("exported {} patterns to {}", patterns.len(), path.display());
    Ok(())
}

/// Loads all patterns from an archive.
///
/// # Errors
///
/// [`ArchiveError::Io`] / [`ArchiveError::Json`] on failure.
pub fn load_patterns(path: &Path) -> Result<Vec<HammeringPattern>, ArchiveError> {
    let file = File::open(path)?;
    let patterns: Vec<HammeringPattern> = serde_json::from_reader(BufReader::new(file))?;
    info!("loaded {} patterns from {}", patterns.len(), path.display());
    Ok(patterns)
}

/// Loads one pattern by instance id.
///
/// # Errors
///
/// [`ArchiveError::PatternNotFound`] when the id is absent, plus the loading
/// errors of [`load_patterns`].
pub fn load_pattern_by_id(path: &Path, pattern_id: &str) -> Result<HammeringPattern, ArchiveError> {
    load_patterns(path)?
        .into_iter()
        .find(|pattern| pattern.id == pattern_id)
        .ok_or_else(|| ArchiveError::PatternNotFound(pattern_id.to_string()))
}

/// Restricts `patterns` to the given ids; an empty id set keeps everything.
pub fn filter_patterns(
    patterns: Vec<HammeringPattern>,
    ids: &HashSet<String>,
) -> Vec<HammeringPattern> {
    if ids.is_empty() {
        return patterns;
    }
    patterns
        .into_iter()
        .filter(|pattern| ids.contains(&pattern.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::PatternBuilder;
    use crate::mapper::PatternAddressMapping;
    use crate::params::FuzzingParameterSet;
    use anvil_core::util::RunRng;

    fn sample_patterns() -> Vec<HammeringPattern> {
        let mut rng = RunRng::seeded(99);
        let params = FuzzingParameterSet::new(100, 8192, 16, &mut rng);
        let mut patterns = Vec::new();
        for _ in 0..3 {
            let mut pattern = HammeringPattern::new(params.base_period(), &mut rng);
            PatternBuilder::new(&mut pattern)
                .generate_frequency_based_pattern(&params, &mut rng)
                .unwrap();
            let mut mapping = PatternAddressMapping::new(&mut rng);
            mapping.randomize_addresses(&params, &pattern.agg_access_patterns, &mut rng);
            pattern.address_mappings.push(mapping);
            patterns.push(pattern);
        }
        patterns
    }

    #[test]
    fn archive_roundtrip() {
        let patterns = sample_patterns();
        let path = std::env::temp_dir().join(format!("anvil-archive-{}.json", std::process::id()));

        export_patterns(&path, &patterns).unwrap();
        let loaded = load_patterns(&path).unwrap();
        assert_eq!(loaded.len(), patterns.len());
        for (a, b) in loaded.iter().zip(&patterns) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.accesses, b.accesses);
            assert_eq!(a.agg_access_patterns, b.agg_access_patterns);
            assert_eq!(a.address_mappings.len(), b.address_mappings.len());
            assert_eq!(
                a.address_mappings[0].aggressor_to_addr,
                b.address_mappings[0].aggressor_to_addr
            );
        }

        let by_id = load_pattern_by_id(&path, &patterns[1].id).unwrap();
        assert_eq!(by_id.id, patterns[1].id);
        assert!(matches!(
            load_pattern_by_id(&path, "no-such-id"),
            Err(ArchiveError::PatternNotFound(_))
        ));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn filtering_by_ids() {
        let patterns = sample_patterns();
        let keep: HashSet<String> = [patterns[0].id.clone(), patterns[2].id.clone()]
            .into_iter()
            .collect();
        let filtered = filter_patterns(patterns.clone(), &keep);
        assert_eq!(filtered.len(), 2);

        let all = filter_patterns(patterns.clone(), &HashSet::new());
        assert_eq!(all.len(), 3);
    }
}
