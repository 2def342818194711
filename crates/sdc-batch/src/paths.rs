//! Default locations of the files a job writes.
//!
//! Everything lives under the job directory and is prefixed with the job
//! name, so two jobs sharing a directory need different names.

use std::path::{Path, PathBuf};

/// Lowercase ASCII letters and digits; any other run of characters becomes
/// a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    directory: PathBuf,
    job: String,
}

impl JobPaths {
    pub fn new(directory: impl Into<PathBuf>, job: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            job: job.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn input_dir(&self) -> PathBuf {
        self.directory.join("input")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.directory.join("output")
    }

    /// Scratch directory handed to the engine.
    pub fn workdir(&self) -> PathBuf {
        self.directory.join("work").join(&self.job)
    }

    pub fn batch(&self) -> PathBuf {
        self.directory.join(format!("{}.arb", self.job))
    }

    pub fn logbook(&self) -> PathBuf {
        self.directory.join(format!("{}_logbook.txt", self.job))
    }

    /// `kind` is `microdata` or `tabledata`.
    pub fn data(&self, kind: &str) -> PathBuf {
        self.input(format!("{kind}.csv"))
    }

    pub fn metadata(&self, kind: &str) -> PathBuf {
        self.input(format!("{kind}.rda"))
    }

    pub fn hierarchy(&self, column: &str) -> PathBuf {
        self.input(format!("{column}_hierarchy.hrc"))
    }

    pub fn codelist(&self, column: &str) -> PathBuf {
        self.input(format!("{column}_codelist.cdl"))
    }

    pub fn apriori(&self, table: &str) -> PathBuf {
        self.input(format!("{}_apriori.hst", slugify(table)))
    }

    pub fn recode(&self, table: &str, column: &str) -> PathBuf {
        self.input(format!("{}_{column}.grc", slugify(table)))
    }

    pub fn output(&self, table: &str) -> PathBuf {
        self.output_dir()
            .join(format!("{}_{}.csv", self.job, slugify(table)))
    }

    fn input(&self, suffix: String) -> PathBuf {
        self.input_dir().join(format!("{}_{suffix}", self.job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs() {
        assert_eq!(slugify("Table 1"), "table-1");
        assert_eq!(slugify("  income / region  "), "income-region");
        assert_eq!(slugify("table-1"), "table-1");
        assert_eq!(slugify("sbi_gk"), "sbi_gk");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn default_layout() {
        let paths = JobPaths::new("/jobs", "survey");
        assert_eq!(paths.batch(), PathBuf::from("/jobs/survey.arb"));
        assert_eq!(paths.logbook(), PathBuf::from("/jobs/survey_logbook.txt"));
        assert_eq!(paths.workdir(), PathBuf::from("/jobs/work/survey"));
        assert_eq!(
            paths.data("microdata"),
            PathBuf::from("/jobs/input/survey_microdata.csv")
        );
        assert_eq!(
            paths.metadata("tabledata"),
            PathBuf::from("/jobs/input/survey_tabledata.rda")
        );
        assert_eq!(
            paths.hierarchy("region"),
            PathBuf::from("/jobs/input/survey_region_hierarchy.hrc")
        );
        assert_eq!(
            paths.codelist("region"),
            PathBuf::from("/jobs/input/survey_region_codelist.cdl")
        );
        assert_eq!(
            paths.apriori("Table 1"),
            PathBuf::from("/jobs/input/survey_table-1_apriori.hst")
        );
        assert_eq!(
            paths.recode("table-1", "region"),
            PathBuf::from("/jobs/input/survey_table-1_region.grc")
        );
        assert_eq!(
            paths.output("Table 1"),
            PathBuf::from("/jobs/output/survey_table-1.csv")
        );
    }
}
