//! TOML job descriptions.
//!
//! A job file names the input CSV, describes its columns and lists the
//! tables to protect:
//!
//! ```toml
//! name = "survey"
//!
//! [input]
//! kind = "microdata"
//! data = "survey.csv"
//! weight = "w"
//!
//! [columns.region]
//! hierarchy = [["North", "A"], ["North", "B"]]
//!
//! [[tables]]
//! explanatory = ["region"]
//! response = "amount"
//! safety_rule = "FREQ(3,20)"
//! suppression = "GH"
//! ```
//!
//! Relative paths are resolved against the directory of the job file.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use polars::prelude::*;
use sdc_batch::{Job, Logbook};
use sdc_hierarchy::{
    CodeList, DEFAULT_INDENT, DEFAULT_TOTAL_CODE, Hierarchy, TreeHierarchy, TreeRecode,
};
use sdc_model::{
    CellOverrides, Cost, InputData, MethodArg, Recode, SafetyRuleSpec, SuppressMethod,
    Suppression, Table,
};
use serde::Deserialize;
use tracing::debug;

const UNITY_COST: &str = "<unity>";
const DISTANCE_COST: &str = "<dist>";
const FREQUENCY_COST: &str = "<freq>";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Defaults to the stem of the job file.
    pub name: Option<String>,
    /// Directory for generated files. Defaults to the job file's directory.
    pub directory: Option<PathBuf>,
    pub input: InputConfig,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnConfig>,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
    pub linked_suppression: Option<SuppressionConfig>,
    /// `"default"`, `"none"` or a path.
    pub logbook: Option<String>,
    #[serde(default)]
    pub interactive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKindConfig {
    #[default]
    Microdata,
    Tabledata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    #[serde(default)]
    pub kind: InputKindConfig,
    pub data: PathBuf,
    #[serde(default = "default_separator")]
    pub separator: char,
    pub weight: Option<String>,
    pub request: Option<String>,
    pub request_values: Option<Vec<String>>,
    pub holding: Option<String>,
    pub frequency: Option<String>,
    #[serde(default)]
    pub top_contributors: Vec<String>,
    pub lower_protection_level: Option<String>,
    pub upper_protection_level: Option<String>,
    pub status_indicator: Option<String>,
    /// Status name to marker, e.g. `SAFE = "S"`.
    pub status_markers: Option<BTreeMap<String, String>>,
    /// The table formed by table data.
    pub table: Option<TableConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    /// Fixed-width level hierarchy.
    pub levels: Option<Vec<u32>>,
    /// Existing `.hrc` file.
    pub hierarchy_file: Option<PathBuf>,
    /// Tree hierarchy as root-to-leaf rows.
    pub hierarchy: Option<Vec<Vec<String>>>,
    pub indent: Option<String>,
    pub total_code: Option<String>,
    pub codelist_file: Option<PathBuf>,
    pub codelist: Option<BTreeMap<String, String>>,
    pub length: Option<usize>,
    pub decimals: Option<u32>,
    #[serde(default)]
    pub missing: Vec<String>,
}

impl ColumnConfig {
    fn is_categorical(&self) -> bool {
        self.levels.is_some()
            || self.hierarchy_file.is_some()
            || self.hierarchy.is_some()
            || self.total_code.is_some()
            || self.codelist_file.is_some()
            || self.codelist.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    pub name: Option<String>,
    pub explanatory: Vec<String>,
    #[serde(default = "default_response")]
    pub response: String,
    pub shadow: Option<String>,
    /// A column or one of `<freq>`, `<unity>`, `<dist>`.
    pub cost: Option<String>,
    pub lambda: Option<f64>,
    pub safety_rule: Option<String>,
    pub holding_rule: Option<String>,
    pub overrides: Option<PathBuf>,
    pub overrides_separator: Option<String>,
    #[serde(default)]
    pub recodes: BTreeMap<String, RecodeConfig>,
    pub suppression: Option<SuppressionConfig>,
    #[serde(default)]
    pub write_options: BTreeMap<String, bool>,
    pub output: Option<PathBuf>,
}

/// `2` collapses to two levels, `["North"]` keeps those codes, a string
/// names an existing `.grc` file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecodeConfig {
    Level(u32),
    Codes(Vec<String>),
    File(PathBuf),
}

/// `"GH"` uses the method's usual arguments; a table gives them explicitly.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SuppressionConfig {
    Method(String),
    Detailed {
        method: String,
        #[serde(default)]
        args: Vec<ArgConfig>,
    },
}

/// An empty string leaves the slot empty.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgConfig {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn default_separator() -> char {
    ','
}

fn default_response() -> String {
    FREQUENCY_COST.to_string()
}

impl JobConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("parse job file")
    }

    /// Builds the job, reading data and referenced files relative to `base`.
    pub fn build(&self, base: &Path, default_name: &str) -> Result<Job> {
        let input = self.input_data(base)?;
        let directory = self
            .directory
            .as_ref()
            .map_or_else(|| base.to_path_buf(), |dir| resolve(base, dir));
        let name = self.name.as_deref().unwrap_or(default_name);
        let mut job = Job::new(input, directory, name)
            .with_interactive(self.interactive)
            .with_logbook(self.logbook_setting(base));
        for (position, config) in self.tables.iter().enumerate() {
            let table = build_table(config, base)
                .with_context(|| format!("table {}", position + 1))?;
            match &config.name {
                Some(name) => job.insert_table(name, table)?,
                None => {
                    job.add_table(table);
                }
            }
        }
        if let Some(linked) = &self.linked_suppression {
            job.set_linked_suppression(Some(linked.to_suppression()?));
        }
        Ok(job)
    }

    fn logbook_setting(&self, base: &Path) -> Logbook {
        match self.logbook.as_deref() {
            None | Some("default") => Logbook::Default,
            Some("none") => Logbook::Disabled,
            Some(path) => Logbook::Path(resolve(base, Path::new(path))),
        }
    }

    /// Columns read as text: explanatory variables plus anything with
    /// hierarchy, total or codelist settings.
    fn categorical_columns(&self) -> BTreeSet<&str> {
        let mut columns: BTreeSet<&str> = self
            .tables
            .iter()
            .chain(self.input.table.as_ref())
            .flat_map(|table| table.explanatory.iter().map(String::as_str))
            .collect();
        columns.extend(
            self.columns
                .iter()
                .filter(|(_, column)| column.is_categorical())
                .map(|(name, _)| name.as_str()),
        );
        columns.extend(self.input.request.as_deref());
        columns.extend(self.input.holding.as_deref());
        columns.extend(self.input.status_indicator.as_deref());
        columns
    }

    fn input_data(&self, base: &Path) -> Result<InputData> {
        let path = resolve(base, &self.input.data);
        let separator = u8::try_from(self.input.separator)
            .map_err(|_| anyhow!("separator '{}' is not a single byte", self.input.separator))?;
        let frame = read_frame(&path, separator, &self.categorical_columns())?;

        let mut input = match self.input.kind {
            InputKindConfig::Microdata => InputData::microdata(frame),
            InputKindConfig::Tabledata => {
                let table = self
                    .input
                    .table
                    .as_ref()
                    .ok_or_else(|| anyhow!("table data needs an [input.table] section"))?;
                InputData::tabular(frame, build_table(table, base)?)
            }
        };
        input.separator = separator;
        self.apply_roles(&mut input)?;
        for (name, column) in &self.columns {
            apply_column(&mut input, name, column, base)
                .with_context(|| format!("column {name}"))?;
        }
        Ok(input)
    }

    fn apply_roles(&self, input: &mut InputData) -> Result<()> {
        let roles = &self.input;
        if let Some(column) = &roles.weight {
            input.set_weight(column)?;
        }
        if let Some(column) = &roles.request {
            let values = roles.request_values.clone().unwrap_or_else(|| {
                sdc_model::DEFAULT_REQUEST_VALUES
                    .map(str::to_string)
                    .to_vec()
            });
            input.set_request(column, values)?;
        }
        if let Some(column) = &roles.holding {
            input.set_holding(column)?;
        }
        if let Some(column) = &roles.frequency {
            input.set_frequency(column)?;
        }
        if !roles.top_contributors.is_empty() {
            input.set_top_contributors(&roles.top_contributors)?;
        }
        if let Some(column) = &roles.lower_protection_level {
            input.set_lower_protection_level(column)?;
        }
        if let Some(column) = &roles.upper_protection_level {
            input.set_upper_protection_level(column)?;
        }
        if let Some(column) = &roles.status_indicator {
            let markers = roles
                .status_markers
                .as_ref()
                .map(|markers| markers.clone().into_iter().collect());
            input.set_status_indicator(column, markers)?;
        }
        Ok(())
    }
}

impl SuppressionConfig {
    pub fn to_suppression(&self) -> Result<Suppression> {
        match self {
            Self::Method(method) => Ok(Suppression::with_default_args(method.parse()?)),
            Self::Detailed { method, args } => {
                let method: SuppressMethod = method.parse()?;
                let mut suppression = Suppression::new(method);
                suppression.args = args.iter().map(ArgConfig::to_arg).collect();
                Ok(suppression)
            }
        }
    }
}

impl ArgConfig {
    fn to_arg(&self) -> Option<MethodArg> {
        match self {
            Self::Bool(value) => Some(MethodArg::Bool(*value)),
            Self::Int(value) => Some(MethodArg::Int(*value)),
            Self::Float(value) => Some(MethodArg::Float(*value)),
            Self::Text(value) if value.is_empty() => None,
            Self::Text(value) => Some(MethodArg::Text(value.clone())),
        }
    }
}

/// Reads a job file and builds the job it describes.
pub fn load_job(path: &Path) -> Result<Job> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config = JobConfig::from_toml(&text).with_context(|| format!("load {}", path.display()))?;
    let base = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let default_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(sdc_batch::DEFAULT_JOB_NAME);
    config.build(base, default_name)
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn read_frame(path: &Path, separator: u8, categorical: &BTreeSet<&str>) -> Result<DataFrame> {
    let header = csv::ReaderBuilder::new()
        .delimiter(separator)
        .from_path(path)
        .and_then(|mut reader| reader.headers().cloned())
        .with_context(|| format!("read header of {}", path.display()))?;
    let schema: Schema = header
        .iter()
        .filter(|name| categorical.contains(name))
        .map(|name| (PlSmallStr::from(name), DataType::String))
        .collect();

    let frame = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(schema)))
        .map_parse_options(|options| options.with_separator(separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .with_context(|| format!("read {}", path.display()))?;
    debug!(path = %path.display(), rows = frame.height(), columns = frame.width(), "read input data");
    Ok(frame)
}

fn apply_column(
    input: &mut InputData,
    name: &str,
    config: &ColumnConfig,
    base: &Path,
) -> Result<()> {
    let total = config.total_code.as_deref().unwrap_or(DEFAULT_TOTAL_CODE);
    let indent = config.indent.as_deref().unwrap_or(DEFAULT_INDENT);
    let hierarchy = match (&config.levels, &config.hierarchy_file, &config.hierarchy) {
        (Some(levels), None, None) => Some(Hierarchy::levels(levels.clone())?),
        (None, Some(file), None) => Some(Hierarchy::tree(TreeHierarchy::read_hrc(
            &resolve(base, file),
            indent,
            total,
        )?)),
        (None, None, Some(rows)) => {
            let mut tree = TreeHierarchy::from_rows(rows, total)?;
            tree.indent = indent.to_string();
            Some(Hierarchy::tree(tree))
        }
        (None, None, None) => None,
        _ => bail!("give at most one of levels, hierarchy_file and hierarchy"),
    };
    if let Some(hierarchy) = hierarchy {
        input.set_hierarchy(name, hierarchy)?;
    }
    if let Some(code) = &config.total_code {
        input.set_total_code(name, code.as_str())?;
    }

    let codelist = match (&config.codelist_file, &config.codelist) {
        (Some(file), None) => Some(CodeList::read_cdl(&resolve(base, file))?),
        (None, Some(labels)) => Some(labels.iter().collect::<CodeList>()),
        (None, None) => None,
        _ => bail!("give either codelist_file or codelist"),
    };
    if let Some(codelist) = codelist {
        input.set_codelist(name, codelist)?;
    }
    if let Some(length) = config.length {
        input.set_length(name, length)?;
    }

    let column = input
        .column_mut(name)
        .ok_or_else(|| anyhow!("column '{name}' not found in input data"))?;
    if let Some(decimals) = config.decimals {
        column.set_decimals(decimals)?;
    }
    if !config.missing.is_empty() {
        column.set_missing(config.missing.iter().map(String::as_str));
    }
    Ok(())
}

fn build_table(config: &TableConfig, base: &Path) -> Result<Table> {
    let mut table = Table::new(
        config.explanatory.iter().map(String::as_str),
        config.response.as_str(),
    );
    if let Some(shadow) = &config.shadow {
        table = table.with_shadow(shadow.as_str());
    }
    if let Some(cost) = &config.cost {
        table = table.with_cost(parse_cost(cost));
    }
    if let Some(lambda) = config.lambda {
        table = table.with_lambda(lambda);
    }

    let mut rules = config
        .safety_rule
        .as_deref()
        .map(SafetyRuleSpec::parse)
        .unwrap_or_default();
    if let Some(holding) = &config.holding_rule {
        rules.holding = SafetyRuleSpec::parse(holding).individual;
    }
    table = table.with_safety_rule(rules);

    if let Some(file) = &config.overrides {
        let separator = config
            .overrides_separator
            .clone()
            .unwrap_or_else(|| CellOverrides::default().separator);
        table = table.with_overrides(CellOverrides::read_hst(&resolve(base, file), &separator)?);
    }
    for (variable, recode) in &config.recodes {
        let recode = match recode {
            RecodeConfig::Level(level) => Recode::Level(*level),
            RecodeConfig::Codes(codes) => {
                Recode::Tree(TreeRecode::new(codes.iter().map(String::as_str)))
            }
            RecodeConfig::File(file) => Recode::File(resolve(base, file)),
        };
        table = table.with_recode(variable.as_str(), recode);
    }
    if let Some(suppression) = &config.suppression {
        table = table.with_suppression(suppression.to_suppression()?);
    }
    for (key, enabled) in &config.write_options {
        table = table.with_write_option(key.as_str(), *enabled);
    }
    if let Some(output) = &config.output {
        table = table.with_output_path(resolve(base, output));
    }
    Ok(table)
}

fn parse_cost(text: &str) -> Cost {
    match text {
        FREQUENCY_COST => Cost::Frequency,
        UNITY_COST => Cost::Unity,
        DISTANCE_COST => Cost::Distance,
        column => Cost::Variable(column.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppression_shorthand_uses_usual_arguments() {
        let config: SuppressionConfig = toml::from_str::<BTreeMap<String, SuppressionConfig>>(
            "s = \"MOD\"",
        )
        .unwrap()
        .remove("s")
        .unwrap();
        assert_eq!(config.to_suppression().unwrap().render(1), "MOD(1,5,1,1,1)");
    }

    #[test]
    fn empty_arguments_leave_slots_open() {
        let config: BTreeMap<String, SuppressionConfig> =
            toml::from_str("s = { method = \"opt\", args = [5, \"\", true] }").unwrap();
        assert_eq!(config["s"].to_suppression().unwrap().render(2), "OPT(2,5,,1)");
    }

    #[test]
    fn unknown_method_is_an_error() {
        let config = SuppressionConfig::Method("magic".into());
        assert!(config.to_suppression().is_err());
    }

    #[test]
    fn recodes_by_shape() {
        let config: BTreeMap<String, RecodeConfig> =
            toml::from_str("a = 2\nb = [\"North\"]\nc = \"region.grc\"").unwrap();
        assert_eq!(config["a"], RecodeConfig::Level(2));
        assert_eq!(config["b"], RecodeConfig::Codes(vec!["North".into()]));
        assert_eq!(config["c"], RecodeConfig::File("region.grc".into()));
    }

    #[test]
    fn pseudo_costs() {
        assert_eq!(parse_cost("<freq>"), Cost::Frequency);
        assert_eq!(parse_cost("<unity>"), Cost::Unity);
        assert_eq!(parse_cost("<dist>"), Cost::Distance);
        assert_eq!(parse_cost("amount"), Cost::Variable("amount".into()));
    }

    #[test]
    fn logbook_setting() {
        let mut config = JobConfig::from_toml("[input]\ndata = \"d.csv\"").unwrap();
        assert_eq!(config.logbook_setting(Path::new("/jobs")), Logbook::Default);
        config.logbook = Some("none".into());
        assert_eq!(config.logbook_setting(Path::new("/jobs")), Logbook::Disabled);
        config.logbook = Some("log.txt".into());
        assert_eq!(
            config.logbook_setting(Path::new("/jobs")),
            Logbook::Path(PathBuf::from("/jobs/log.txt"))
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(JobConfig::from_toml("[input]\ndata = \"d.csv\"\ncolour = 1").is_err());
    }
}
