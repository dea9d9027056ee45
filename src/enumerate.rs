//! Enumerates the remote files of one day and where they land locally.
//!
//! Every coordinate of the catalogue product maps to exactly one URL and one
//! local path. The mapping is pure: nothing here touches the network, and the
//! only filesystem access is the read-only layout check.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::catalog::{Field, Level, Model, RunHour, MEMBER_COUNT};

pub const DEFAULT_BASE_URL: &str = "http://opendata.dwd.de/weather/nwp/icon-d2/grib";

const FILE_PREFIX: &str = "icon-d2_germany";
const FILE_SUFFIX: &str = ".grib2.bz2";

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("destination root `{}` does not exist", .0.display())]
    RootNotFound(PathBuf),
    #[error("{} destination directories do not exist, first missing: `{}`", .0.len(), .0[0].display())]
    MissingDirectories(Vec<PathBuf>),
}

/// One remote file: which product, run, component, member and level on which day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetCoordinate {
    pub model: Model,
    pub run_hour: RunHour,
    pub field: Field,
    pub member: u8,
    pub level: Level,
    pub date: NaiveDate,
}

impl DatasetCoordinate {
    /// Remote file name, e.g.
    /// `icon-d2_germany_regular-lat-lon_model-level_2022111400_000_10_u.grib2.bz2`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}{}_{:03}_{}_{}{}",
            FILE_PREFIX,
            self.model,
            self.date.format("%Y%m%d"),
            self.run_hour,
            self.member,
            self.level,
            self.field,
            FILE_SUFFIX
        )
    }

    pub fn resource(&self, base_url: &str) -> RemoteResource {
        RemoteResource {
            url: format!(
                "{}/{}/{}/{}",
                base_url.trim_end_matches('/'),
                self.run_hour,
                self.field,
                self.file_name()
            ),
        }
    }

    /// Directory the file is stored in: `root/<run_hour>/<field>`.
    pub fn directory(&self, root: &Path) -> PathBuf {
        root.join(self.run_hour.to_string()).join(self.field.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteResource {
    pub url: String,
}

impl RemoteResource {
    pub fn new(url: impl Into<String>) -> Self {
        RemoteResource { url: url.into() }
    }

    /// Last path segment of the URL.
    pub fn basename(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalArtifact {
    pub directory: PathBuf,
    pub filename: String,
}

impl LocalArtifact {
    pub fn new(directory: impl Into<PathBuf>, resource: &RemoteResource) -> Self {
        LocalArtifact {
            directory: directory.into(),
            filename: sanitize_file_name(resource.basename()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Spaces are not welcome in local file names.
pub fn sanitize_file_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// A single planned download.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedDownload {
    pub coordinate: Option<DatasetCoordinate>,
    pub resource: RemoteResource,
    pub artifact: LocalArtifact,
}

impl PlannedDownload {
    /// A download that does not come from the catalogue, e.g. a single URL.
    pub fn from_url(url: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        let resource = RemoteResource::new(url);
        let artifact = LocalArtifact::new(directory, &resource);

        PlannedDownload {
            coordinate: None,
            resource,
            artifact,
        }
    }
}

/// Subset of the catalogue to enumerate. The default is the whole catalogue.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub models: Vec<Model>,
    pub run_hours: Vec<RunHour>,
    pub fields: Vec<Field>,
    pub members: Vec<u8>,
    pub levels: Vec<Level>,
}

impl Default for Selection {
    fn default() -> Self {
        Selection {
            models: Model::ALL.to_vec(),
            run_hours: RunHour::ALL.to_vec(),
            fields: Field::ALL.to_vec(),
            members: (0..MEMBER_COUNT).collect(),
            levels: Level::all().collect(),
        }
    }
}

impl Selection {
    /// Number of coordinates in the product.
    pub fn len(&self) -> usize {
        self.models.len()
            * self.run_hours.len()
            * self.fields.len()
            * self.members.len()
            * self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Mixed-radix decode; the level varies fastest, the model slowest.
    fn coordinate(&self, date: NaiveDate, index: usize) -> DatasetCoordinate {
        let mut rest = index;
        let level = self.levels[rest % self.levels.len()];
        rest /= self.levels.len();
        let member = self.members[rest % self.members.len()];
        rest /= self.members.len();
        let field = self.fields[rest % self.fields.len()];
        rest /= self.fields.len();
        let run_hour = self.run_hours[rest % self.run_hours.len()];
        rest /= self.run_hours.len();
        let model = self.models[rest];

        DatasetCoordinate {
            model,
            run_hour,
            field,
            member,
            level,
            date,
        }
    }
}

/// Lazy, restartable sequence of planned downloads. Clone it to start over.
#[derive(Debug, Clone)]
pub struct Enumeration {
    date: NaiveDate,
    root: PathBuf,
    base_url: String,
    selection: Selection,
    next: usize,
    end: usize,
}

/// Every file of the full catalogue for `date`, stored below `root`.
pub fn enumerate(date: NaiveDate, root: impl Into<PathBuf>) -> Enumeration {
    Enumeration::new(date, root, Selection::default())
}

impl Enumeration {
    pub fn new(date: NaiveDate, root: impl Into<PathBuf>, selection: Selection) -> Self {
        let end = selection.len();
        Enumeration {
            date,
            root: root.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            selection,
            next: 0,
            end,
        }
    }

    /// Narrows the plan and restarts it from the beginning.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.end = selection.len();
        self.next = 0;
        self.selection = selection;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Distinct destination directories, in enumeration order.
    pub fn directories(&self) -> Vec<PathBuf> {
        if self.selection.is_empty() {
            return Vec::new();
        }

        let mut directories = Vec::new();
        for run_hour in &self.selection.run_hours {
            for field in &self.selection.fields {
                let directory = self.root.join(run_hour.to_string()).join(field.as_str());
                if !directories.contains(&directory) {
                    directories.push(directory);
                }
            }
        }

        directories
    }

    /// Checks that the root and every destination directory already exist.
    /// Nothing is created.
    pub fn verify_layout(&self) -> Result<(), LayoutError> {
        if !self.root.is_dir() {
            return Err(LayoutError::RootNotFound(self.root.clone()));
        }

        let missing: Vec<PathBuf> = self
            .directories()
            .into_iter()
            .filter(|directory| !directory.is_dir())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LayoutError::MissingDirectories(missing))
        }
    }

    fn planned(&self, index: usize) -> PlannedDownload {
        let coordinate = self.selection.coordinate(self.date, index);
        let resource = coordinate.resource(&self.base_url);
        let artifact = LocalArtifact::new(coordinate.directory(&self.root), &resource);

        PlannedDownload {
            coordinate: Some(coordinate),
            resource,
            artifact,
        }
    }
}

impl Iterator for Enumeration {
    type Item = PlannedDownload;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let planned = self.planned(self.next);
        self.next += 1;

        Some(planned)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Enumeration {}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 11, 14).unwrap()
    }

    #[test]
    fn should_enumerate_the_full_product() {
        let plan = enumerate(date(), "/data");
        assert_eq!(plan.len(), 4 * 8 * 3 * 5 * 65);
        assert_eq!(plan.count(), 31_200);
    }

    #[test]
    fn should_enumerate_one_model_per_7800_files() {
        let selection = Selection {
            models: vec![Model::RegularLatLonModelLevel],
            ..Selection::default()
        };
        assert_eq!(Enumeration::new(date(), "/data", selection).count(), 7_800);
    }

    #[test]
    fn should_build_the_remote_url() {
        let coordinate = DatasetCoordinate {
            model: Model::RegularLatLonModelLevel,
            run_hour: RunHour::new(0).unwrap(),
            field: Field::U,
            member: 0,
            level: Level::new(10).unwrap(),
            date: date(),
        };

        assert_eq!(
            coordinate.resource(DEFAULT_BASE_URL).url,
            "http://opendata.dwd.de/weather/nwp/icon-d2/grib/00/u/\
             icon-d2_germany_regular-lat-lon_model-level_2022111400_000_10_u.grib2.bz2"
        );
    }

    #[test]
    fn should_zero_pad_single_digit_dates() {
        let coordinate = DatasetCoordinate {
            model: Model::IcosahedralModelLevel,
            run_hour: RunHour::new(3).unwrap(),
            field: Field::W,
            member: 4,
            level: Level::new(64).unwrap(),
            date: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
        };

        assert_eq!(
            coordinate.file_name(),
            "icon-d2_germany_icosahedral_model-level_2023010503_004_64_w.grib2.bz2"
        );
    }

    #[test]
    fn should_place_files_by_run_hour_and_field() {
        let first = enumerate(date(), "/data").next().unwrap();

        assert_eq!(first.artifact.directory, PathBuf::from("/data/00/u"));
        assert_eq!(
            first.artifact.path(),
            PathBuf::from(
                "/data/00/u/icon-d2_germany_icosahedral_model-level_2022111400_000_0_u.grib2.bz2"
            )
        );
    }

    #[test]
    fn should_rederive_identical_urls_and_paths() {
        let first: Vec<_> = enumerate(date(), "/data").collect();
        let second: Vec<_> = enumerate(date(), "/data").collect();
        assert_eq!(first, second);

        for planned in first.iter().step_by(97) {
            let coordinate = planned.coordinate.unwrap();
            let resource = coordinate.resource(DEFAULT_BASE_URL);
            assert_eq!(resource, planned.resource);
            assert_eq!(
                LocalArtifact::new(coordinate.directory(Path::new("/data")), &resource),
                planned.artifact
            );
        }
    }

    #[test]
    fn should_restart_from_a_clone() {
        let mut plan = enumerate(date(), "/data");
        let snapshot = plan.clone();
        plan.by_ref().take(10).for_each(drop);

        assert_eq!(plan.len(), 31_190);
        assert_eq!(snapshot.len(), 31_200);

        let narrowed = plan.with_selection(Selection {
            fields: vec![Field::W],
            ..Selection::default()
        });
        assert_eq!(narrowed.len(), 10_400);
    }

    #[test]
    fn should_never_repeat_a_local_path() {
        let paths: HashSet<PathBuf> = enumerate(date(), "/data")
            .map(|planned| planned.artifact.path())
            .collect();
        assert_eq!(paths.len(), 31_200);
    }

    #[test]
    fn should_vary_level_fastest() {
        let second = enumerate(date(), "/data").nth(1).unwrap().coordinate.unwrap();
        assert_eq!(second.level.to_string(), "1");
        assert_eq!(second.member, 0);

        let last = enumerate(date(), "/data").last().unwrap().coordinate.unwrap();
        assert_eq!(last.model, Model::RegularLatLonPressureLevel);
        assert_eq!(last.run_hour.to_string(), "21");
        assert_eq!(last.field, Field::W);
        assert_eq!(last.member, 4);
        assert_eq!(last.level.to_string(), "64");
    }

    #[test]
    fn should_use_a_custom_base_url() {
        let planned = enumerate(date(), "/data")
            .with_base_url("http://127.0.0.1:8080/grib/")
            .next()
            .unwrap();
        assert!(planned.resource.url.starts_with("http://127.0.0.1:8080/grib/00/u/"));
    }

    #[test]
    fn should_replace_spaces_in_file_names() {
        let planned = PlannedDownload::from_url("http://host/a/my file 1.grib2.bz2", "/tmp");
        assert_eq!(planned.artifact.filename, "my_file_1.grib2.bz2");
        assert_eq!(planned.resource.basename(), "my file 1.grib2.bz2");
    }

    #[test]
    fn should_list_each_directory_once() {
        let directories = enumerate(date(), "/data").directories();
        assert_eq!(directories.len(), 24);
        assert_eq!(directories[0], PathBuf::from("/data/00/u"));
        assert_eq!(directories[23], PathBuf::from("/data/21/w"));
    }

    #[test]
    fn should_reject_a_missing_root() {
        let err = enumerate(date(), "/does/not/exist").verify_layout().unwrap_err();
        assert_eq!(err, LayoutError::RootNotFound(PathBuf::from("/does/not/exist")));
    }

    #[test]
    fn should_report_missing_directories_without_creating_them() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("00").join("u")).unwrap();

        let selection = Selection {
            run_hours: vec![RunHour::new(0).unwrap()],
            fields: vec![Field::U, Field::V],
            ..Selection::default()
        };
        let plan = Enumeration::new(date(), root.path(), selection);

        let err = plan.verify_layout().unwrap_err();
        assert_eq!(
            err,
            LayoutError::MissingDirectories(vec![root.path().join("00").join("v")])
        );
        assert!(!root.path().join("00").join("v").exists());

        fs::create_dir_all(root.path().join("00").join("v")).unwrap();
        assert!(plan.verify_layout().is_ok());
    }

    #[test]
    fn should_enumerate_nothing_for_an_empty_selection() {
        let selection = Selection {
            fields: vec![],
            ..Selection::default()
        };
        let plan = Enumeration::new(date(), "/data", selection);
        assert!(plan.directories().is_empty());
        assert_eq!(plan.count(), 0);
    }
}
