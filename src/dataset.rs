use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::DatasetError;
use crate::location::Location;

/// Supplies the target for each round.
pub trait TargetProvider {
    fn target_location_for(&self, round_index: usize) -> Result<Location, DatasetError>;

    /// Number of distinct targets; indices `0..entry_count()` resolve.
    fn entry_count(&self) -> usize;

    /// Image shown to the player for this round, if the provider has one.
    fn image_for(&self, _round_index: usize) -> Option<PathBuf> {
        None
    }
}

impl TargetProvider for Vec<Location> {
    fn target_location_for(&self, round_index: usize) -> Result<Location, DatasetError> {
        self.get(round_index)
            .copied()
            .ok_or(DatasetError::NotFound(round_index))
    }

    fn entry_count(&self) -> usize {
        self.len()
    }
}

/// Locations read from a `coords.csv` file, one `lat,lon` record per image.
///
/// Entry `i` belongs to `images_dir/{i}.png`.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    locations: Vec<Location>,
    images_dir: PathBuf,
}

impl CsvDataset {
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        coords_csv: P,
        images_dir: Q,
    ) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(coords_csv.as_ref())?;
        let mut dataset = Self::from_reader(file)?;
        dataset.images_dir = images_dir.as_ref().to_path_buf();
        debug!(
            path = %coords_csv.as_ref().display(),
            entries = dataset.len(),
            "loaded coordinate dataset"
        );
        Ok(dataset)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut locations = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());

            if record.iter().all(str::is_empty) {
                continue;
            }
            if record.len() < 2 {
                return Err(DatasetError::Malformed {
                    line,
                    reason: format!("expected latitude and longitude, got {} field(s)", record.len()),
                });
            }

            let malformed = |reason: String| DatasetError::Malformed { line, reason };
            let lat: f64 = record[0]
                .parse()
                .map_err(|_| malformed(format!("'{}' is not a number", &record[0])))?;
            let lon: f64 = record[1]
                .parse()
                .map_err(|_| malformed(format!("'{}' is not a number", &record[1])))?;
            let location = Location::new(lat, lon).map_err(|e| malformed(e.to_string()))?;

            locations.push(location);
        }

        Ok(Self {
            locations,
            images_dir: PathBuf::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }
}

impl TargetProvider for CsvDataset {
    fn target_location_for(&self, round_index: usize) -> Result<Location, DatasetError> {
        self.locations
            .get(round_index)
            .copied()
            .ok_or(DatasetError::NotFound(round_index))
    }

    fn entry_count(&self) -> usize {
        self.locations.len()
    }

    fn image_for(&self, round_index: usize) -> Option<PathBuf> {
        (round_index < self.locations.len())
            .then(|| self.images_dir.join(format!("{round_index}.png")))
    }
}

/// Visits every entry of an inner provider once, in a seeded random order.
#[derive(Debug, Clone)]
pub struct ShuffledTargets<P> {
    inner: P,
    order: Vec<usize>,
}

impl<P: TargetProvider> ShuffledTargets<P> {
    pub fn new(inner: P, seed: u64) -> Self {
        let mut order: Vec<usize> = (0..inner.entry_count()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        Self { inner, order }
    }

    pub fn remaining_after(&self, rounds_started: usize) -> usize {
        self.order.len().saturating_sub(rounds_started)
    }

    fn entry_for(&self, round_index: usize) -> Result<usize, DatasetError> {
        self.order
            .get(round_index)
            .copied()
            .ok_or(DatasetError::NotFound(round_index))
    }
}

impl<P: TargetProvider> TargetProvider for ShuffledTargets<P> {
    fn target_location_for(&self, round_index: usize) -> Result<Location, DatasetError> {
        let entry = self.entry_for(round_index)?;
        self.inner.target_location_for(entry)
    }

    fn entry_count(&self) -> usize {
        self.order.len()
    }

    fn image_for(&self, round_index: usize) -> Option<PathBuf> {
        self.entry_for(round_index)
            .ok()
            .and_then(|entry| self.inner.image_for(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::tempdir;

    const COORDS: &str = "40.7128,-74.0060\n42.3601, -71.0589\n\n-33.8688,151.2093,extra\n";

    #[test]
    fn vec_provider_and_not_found() {
        let targets = vec![Location::new(1.0, 2.0).unwrap()];
        assert_eq!(
            targets.target_location_for(0).unwrap(),
            Location::new(1.0, 2.0).unwrap()
        );
        assert_matches!(targets.target_location_for(1), Err(DatasetError::NotFound(1)));
        assert_eq!(targets.image_for(0), None);
    }

    #[test]
    fn reads_records_skipping_blank_lines_and_extra_columns() {
        let ds = CsvDataset::from_reader(COORDS.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.locations()[1], Location::new(42.3601, -71.0589).unwrap());
        assert_eq!(ds.locations()[2], Location::new(-33.8688, 151.2093).unwrap());
    }

    #[test]
    fn reports_malformed_line() {
        let err = CsvDataset::from_reader("1,2\nnorth,5\n".as_bytes()).unwrap_err();
        assert_matches!(err, DatasetError::Malformed { line: 2, .. });

        let err = CsvDataset::from_reader("1\n".as_bytes()).unwrap_err();
        assert_matches!(err, DatasetError::Malformed { line: 1, .. });

        let err = CsvDataset::from_reader("95,0\n".as_bytes()).unwrap_err();
        assert_matches!(err, DatasetError::Malformed { reason, .. } if reason.contains("Invalid coordinate"));
    }

    #[test]
    fn load_from_file_with_image_paths() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("coords.csv");
        let mut f = std::fs::File::create(&csv_path).unwrap();
        f.write_all(COORDS.as_bytes()).unwrap();

        let images = dir.path().join("images");
        let ds = CsvDataset::load(&csv_path, &images).unwrap();
        assert_eq!(ds.image_for(2), Some(images.join("2.png")));
        assert_eq!(ds.image_for(3), None);
        assert_matches!(ds.target_location_for(3), Err(DatasetError::NotFound(3)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = CsvDataset::load(dir.path().join("nope.csv"), dir.path()).unwrap_err();
        assert_matches!(err, DatasetError::Io(_));
    }

    #[test]
    fn shuffled_is_a_seeded_permutation() {
        let inner: Vec<Location> = (0..20)
            .map(|i| Location::new(i as f64, 0.0).unwrap())
            .collect();
        let a = ShuffledTargets::new(inner.clone(), 7);
        let b = ShuffledTargets::new(inner.clone(), 7);

        let mut seen: Vec<i64> = (0..20)
            .map(|i| a.target_location_for(i).unwrap().latitude() as i64)
            .collect();
        for i in 0..20 {
            assert_eq!(a.target_location_for(i).unwrap(), b.target_location_for(i).unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<i64>>());

        assert_matches!(a.target_location_for(20), Err(DatasetError::NotFound(20)));
        assert_eq!(a.remaining_after(5), 15);
        assert_eq!(a.remaining_after(25), 0);
    }

    #[test]
    fn shuffled_forwards_images() {
        let ds = CsvDataset::from_reader(COORDS.as_bytes()).unwrap();
        let shuffled = ShuffledTargets::new(ds, 1);
        let image = shuffled.image_for(0).unwrap();
        let name = image.file_name().unwrap().to_string_lossy().into_owned();
        assert!(["0.png", "1.png", "2.png"].contains(&name.as_str()));
        assert_eq!(shuffled.image_for(3), None);
    }

    #[test]
    fn shuffled_size_follows_inner_provider() {
        let shuffled = ShuffledTargets::new(vec![Location::new(10.0, 20.0).unwrap()], 0);
        assert_eq!(shuffled.entry_count(), 1);
        assert_eq!(shuffled.remaining_after(0), 1);
        assert!(shuffled.target_location_for(0).is_ok());
        assert_matches!(shuffled.target_location_for(1), Err(DatasetError::NotFound(1)));
        assert_matches!(shuffled.target_location_for(2), Err(DatasetError::NotFound(2)));
    }
}
