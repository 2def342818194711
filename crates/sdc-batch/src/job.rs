//! A complete protection job: input data, tables and the files between them.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use sdc_hierarchy::Hierarchy;
use sdc_model::{DEFAULT_CODE_LENGTH, InputData, Recode, Suppression, Table};
use tracing::{debug, info, info_span, warn};

use crate::command::{BatchCommand, CSV_TABLE_KIND, RecodeTarget};
use crate::error::{JobError, Result};
use crate::paths::{JobPaths, slugify};
use crate::runner::{RunReport, Runner};
use crate::writer::BatchWriter;

/// Name given to the table formed by table data input.
pub const INPUT_TABLE_NAME: &str = "table-1";
/// Job name used when the given one has no usable characters.
pub const DEFAULT_JOB_NAME: &str = "job";

/// Where the engine should write its logbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Logbook {
    /// `<dir>/<job>_logbook.txt`
    #[default]
    Default,
    Path(PathBuf),
    Disabled,
}

#[derive(Debug, Clone)]
pub struct Job {
    name: String,
    paths: JobPaths,
    input: InputData,
    tables: Vec<(String, Table)>,
    linked_suppression: Option<Suppression>,
    logbook: Logbook,
    interactive: bool,
}

impl Job {
    /// A job writing its files under `directory`. The name is slugified and
    /// prefixes every default file name.
    pub fn new(input: InputData, directory: impl Into<PathBuf>, name: &str) -> Self {
        let directory = directory.into();
        let directory = std::path::absolute(&directory).unwrap_or(directory);
        let mut name = slugify(name);
        if name.is_empty() {
            name = DEFAULT_JOB_NAME.to_string();
        }
        Self {
            paths: JobPaths::new(directory, name.clone()),
            name,
            input,
            tables: Vec::new(),
            linked_suppression: None,
            logbook: Logbook::Default,
            interactive: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        self.paths.directory()
    }

    pub fn paths(&self) -> &JobPaths {
        &self.paths
    }

    pub fn input(&self) -> &InputData {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputData {
        &mut self.input
    }

    /// Adds a named table.
    pub fn with_table(mut self, name: &str, table: Table) -> Result<Self> {
        self.insert_table(name, table)?;
        Ok(self)
    }

    pub fn insert_table(&mut self, name: &str, table: Table) -> Result<()> {
        if self.tables.iter().any(|(existing, _)| existing == name) {
            return Err(JobError::DuplicateTable {
                name: name.to_string(),
            });
        }
        self.tables.push((name.to_string(), table));
        Ok(())
    }

    /// Adds a table named `table-<n>` and returns that name.
    pub fn add_table(&mut self, table: Table) -> String {
        let mut index = self.tables.len() + 1;
        let mut name = format!("table-{index}");
        while self.tables.iter().any(|(existing, _)| *existing == name) {
            index += 1;
            name = format!("table-{index}");
        }
        self.tables.push((name.clone(), table));
        name
    }

    /// Tables in declaration order. Table data input without explicit
    /// tables yields the table the input forms.
    pub fn tables(&self) -> Vec<(&str, &Table)> {
        if self.tables.is_empty() {
            return self
                .input
                .table()
                .map(|table| (INPUT_TABLE_NAME, table))
                .into_iter()
                .collect();
        }
        self.tables
            .iter()
            .map(|(name, table)| (name.as_str(), table))
            .collect()
    }

    fn tables_mut(&mut self) -> Vec<(&str, &mut Table)> {
        if self.tables.is_empty() {
            return self
                .input
                .table_mut()
                .map(|table| (INPUT_TABLE_NAME, table))
                .into_iter()
                .collect();
        }
        self.tables
            .iter_mut()
            .map(|(name, table)| (name.as_str(), table))
            .collect()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables()
            .into_iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, table)| table)
    }

    /// Suppression run over all tables at once (table index 0).
    #[must_use]
    pub fn with_linked_suppression(mut self, suppression: Suppression) -> Self {
        self.linked_suppression = Some(suppression);
        self
    }

    pub fn set_linked_suppression(&mut self, suppression: Option<Suppression>) {
        self.linked_suppression = suppression;
    }

    pub fn linked_suppression(&self) -> Option<&Suppression> {
        self.linked_suppression.as_ref()
    }

    #[must_use]
    pub fn with_logbook(mut self, logbook: Logbook) -> Self {
        self.logbook = logbook;
        self
    }

    /// Opens the engine's user interface once the batch has run.
    #[must_use]
    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn batch_path(&self) -> PathBuf {
        self.paths.batch()
    }

    pub fn workdir(&self) -> PathBuf {
        self.paths.workdir()
    }

    pub fn logbook_path(&self) -> Option<PathBuf> {
        match &self.logbook {
            Logbook::Default => Some(self.paths.logbook()),
            Logbook::Path(path) => Some(std::path::absolute(path).unwrap_or_else(|_| path.clone())),
            Logbook::Disabled => None,
        }
    }

    /// Every reference problem in the job, in table order.
    pub fn problems(&self) -> Vec<String> {
        let mut problems: Vec<String> = Vec::new();
        let mut report = |problem: String| {
            if !problems.contains(&problem) {
                problems.push(problem);
            }
        };

        for (_, table) in self.tables() {
            for variable in table.find_variables() {
                if !self.input.contains(variable) {
                    report(format!("Variable {variable} not present in input data."));
                }
            }
            for variable in table.categorical_variables() {
                if let Some(column) = self.input.column(variable)
                    && !column.is_recodable()
                {
                    report(format!(
                        "Variable {variable} not recodable. Add a hierarchy or total code to resolve."
                    ));
                }
            }
            for variable in table.numeric_variables() {
                if let Some(column) = self.input.column(variable)
                    && !column.is_numeric()
                {
                    report(format!("Variable {variable} not numeric."));
                }
            }
        }

        for column in self.input.columns() {
            if let Hierarchy::Level(levels) = column.hierarchy()
                && let Some(length) = column.explicit_length()
                && length != levels.code_length()
            {
                report(format!(
                    "Variable {} has length {length} but its hierarchy levels add up to {}.",
                    column.name(),
                    levels.code_length()
                ));
            }
        }

        problems
    }

    /// Fails with all problems at once when the job is inconsistent.
    pub fn check(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            return Ok(());
        }
        for problem in &problems {
            warn!(job = %self.name, "{problem}");
        }
        Err(JobError::Consistency { problems })
    }

    /// The batch commands of this job. Every file must already be known,
    /// which [`Job::setup`] takes care of.
    pub fn commands(&self) -> Result<Vec<BatchCommand>> {
        let tables = self.tables();
        if tables.is_empty() {
            return Err(JobError::NoTables);
        }
        let data = self
            .input
            .data_path()
            .ok_or(JobError::MissingArtifact {
                artifact: "input data",
            })?
            .to_path_buf();
        let metadata = self
            .input
            .metadata_path()
            .ok_or(JobError::MissingArtifact {
                artifact: "metadata",
            })?
            .to_path_buf();

        let microdata = self.input.is_microdata();
        let mut commands = vec![
            if microdata {
                BatchCommand::OpenMicrodata(data)
            } else {
                BatchCommand::OpenTableData(data)
            },
            BatchCommand::OpenMetadata(metadata),
        ];

        for (name, table) in &tables {
            commands.push(BatchCommand::SpecifyTable {
                explanatory: table.explanatory.clone(),
                response: table.response.clone(),
                shadow: table.shadow.clone(),
                cost: table.cost.clone(),
                lambda: table.lambda,
            });
            let rules = table.safety_rule.compose().map_err(|source| JobError::Rule {
                table: (*name).to_string(),
                source,
            })?;
            commands.push(BatchCommand::SafetyRule(rules));
        }

        commands.push(if microdata {
            BatchCommand::ReadMicrodata
        } else {
            BatchCommand::ReadTable {
                compute_totals: None,
            }
        });

        for (index, (name, table)) in tables.iter().enumerate() {
            let t = index + 1;
            let unresolved = |artifact| JobError::Unresolved {
                table: (*name).to_string(),
                artifact,
            };
            if let Some(overrides) = &table.overrides {
                let path = overrides.filepath().ok_or_else(|| unresolved("a priori changes"))?;
                commands.push(BatchCommand::Apriori {
                    path: path.to_path_buf(),
                    table: t,
                    separator: overrides.separator.clone(),
                    ignore_error: overrides.ignore_error,
                    expand_trivial: overrides.expand_trivial,
                });
            }
            for (variable, recode) in &table.recodes {
                let target = match recode {
                    Recode::File(path) => RecodeTarget::File(path.clone()),
                    Recode::Level(level) => RecodeTarget::Level(*level),
                    Recode::Tree(tree) => RecodeTarget::File(
                        tree.filepath()
                            .ok_or_else(|| unresolved("a tree recode"))?
                            .to_path_buf(),
                    ),
                };
                commands.push(BatchCommand::Recode {
                    table: t,
                    variable: variable.clone(),
                    target,
                });
            }
            if let Some(suppression) = &table.suppression {
                commands.push(BatchCommand::Suppress {
                    table: t,
                    suppression: suppression.clone(),
                });
            }
        }

        if let Some(linked) = &self.linked_suppression {
            commands.push(BatchCommand::Suppress {
                table: 0,
                suppression: linked.clone(),
            });
        }

        for (index, (name, table)) in tables.iter().enumerate() {
            let path = table.output_path.clone().ok_or_else(|| JobError::Unresolved {
                table: (*name).to_string(),
                artifact: "an output file",
            })?;
            commands.push(BatchCommand::WriteTable {
                table: index + 1,
                kind: CSV_TABLE_KIND,
                options: table.write_options.clone(),
                path,
            });
        }

        if self.interactive {
            commands.push(BatchCommand::GoInteractive);
        }

        Ok(commands)
    }

    /// Writes every file the engine needs and the batch file itself.
    ///
    /// Files whose path is already set are left alone, so running setup
    /// again only rewrites the batch file.
    pub fn setup(&mut self) -> Result<()> {
        let span = info_span!("setup", job = %self.name);
        let _guard = span.enter();

        if self.tables().is_empty() {
            return Err(JobError::NoTables);
        }
        self.create_directories()?;
        self.setup_input_data()?;
        self.setup_hierarchies()?;
        self.setup_codelists()?;
        self.setup_metadata()?;
        self.setup_tables()?;
        self.check()?;

        let commands = self.commands()?;
        let batch = self.paths.batch();
        write_batch_file(&batch, &commands)?;
        info!(
            tables = self.tables().len(),
            commands = commands.len(),
            batch = %batch.display(),
            "job set up"
        );
        Ok(())
    }

    /// Sets the job up and hands it to `runner`. A non-zero exit code is
    /// returned as [`JobError::EngineFailed`].
    pub fn run(&mut self, runner: &dyn Runner) -> Result<RunReport> {
        self.setup()?;
        let batch = self.paths.batch();
        let workdir = self.paths.workdir();
        let logbook = self.logbook_path();
        info!(job = %self.name, batch = %batch.display(), "running job");
        let report = runner.run(&batch, logbook.as_deref(), Some(&workdir))?;
        debug!(job = %self.name, status = report.status(), "engine finished");
        report.check()
    }

    fn create_directories(&self) -> Result<()> {
        for dir in [
            self.paths.input_dir(),
            self.paths.output_dir(),
            self.paths.workdir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| JobError::io(&dir, e))?;
        }
        Ok(())
    }

    fn setup_input_data(&mut self) -> Result<()> {
        if let Some(path) = self.input.data_path() {
            debug!(path = %path.display(), "using existing input data");
            return Ok(());
        }
        let path = self.paths.data(self.input.kind_name());
        self.input.write_data(&path)?;
        Ok(())
    }

    fn setup_hierarchies(&mut self) -> Result<()> {
        for column in self.input.columns_mut() {
            let unwritten = column
                .hierarchy()
                .as_tree()
                .is_some_and(|tree| tree.filepath().is_none());
            if !unwritten {
                continue;
            }
            let length = column.length();
            let path = self.paths.hierarchy(column.name());
            if let Some(tree) = column.hierarchy_mut().as_tree_mut() {
                tree.write_hrc(&path, length)?;
            }
        }
        Ok(())
    }

    fn setup_codelists(&mut self) -> Result<()> {
        for column in self.input.columns_mut() {
            let unwritten = column
                .codelist()
                .is_some_and(|codelist| codelist.filepath().is_none());
            if !unwritten {
                continue;
            }
            let length = column.length();
            let path = self.paths.codelist(column.name());
            if let Some(codelist) = column.codelist_mut() {
                codelist.write_cdl(&path, length)?;
            }
        }
        Ok(())
    }

    fn setup_metadata(&mut self) -> Result<()> {
        if let Some(path) = self.input.metadata_path() {
            debug!(path = %path.display(), "using existing metadata");
            return Ok(());
        }
        let path = self.paths.metadata(self.input.kind_name());
        self.input.write_metadata(&path)?;
        Ok(())
    }

    fn setup_tables(&mut self) -> Result<()> {
        let paths = self.paths.clone();
        let lengths: HashMap<String, usize> = self
            .input
            .columns()
            .iter()
            .map(|column| (column.name().to_string(), column.length()))
            .collect();

        for (name, table) in self.tables_mut() {
            if table.output_path.is_none() {
                table.output_path = Some(paths.output(name));
            }
            if let Some(overrides) = &mut table.overrides
                && overrides.filepath().is_none()
            {
                overrides.write_hst(&paths.apriori(name))?;
            }
            for (variable, recode) in &mut table.recodes {
                if let Recode::Tree(tree) = recode
                    && tree.filepath().is_none()
                {
                    let length = lengths
                        .get(variable.as_str())
                        .copied()
                        .unwrap_or(DEFAULT_CODE_LENGTH);
                    tree.write_grc(&paths.recode(name, variable), length)?;
                }
            }
        }
        Ok(())
    }
}

fn write_batch_file(path: &Path, commands: &[BatchCommand]) -> Result<()> {
    let file = File::create(path).map_err(|e| JobError::io(path, e))?;
    let mut writer = BatchWriter::new(BufWriter::new(file));
    writer
        .write_all(commands)
        .map_err(|e| JobError::io(path, e))?;
    writer.finish().map_err(|e| JobError::io(path, e))?;
    debug!(path = %path.display(), commands = commands.len(), "wrote batch file");
    Ok(())
}
