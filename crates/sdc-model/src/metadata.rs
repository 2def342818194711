//! Metadata (`.rda`) files describing the input data to the engine.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ModelError, Result};
use crate::input::{InputData, InputKind};

impl InputData {
    /// Renders the metadata file: separator, status markers for table data,
    /// then every column with its properties and role markers.
    pub fn metadata_text(&self) -> Result<String> {
        let mut lines = vec![format!("\t<SEPARATOR> {}", char::from(self.separator))];

        match self.kind() {
            InputKind::Microdata(roles) => {
                for column in self.columns() {
                    lines.extend(column.metadata_lines(true)?);
                    let name = Some(column.name());
                    if roles.weight.as_deref() == name {
                        lines.push("\t<WEIGHT>".to_string());
                    }
                    if roles.request.as_deref() == name {
                        let values: Vec<String> = roles
                            .request_values
                            .iter()
                            .map(|value| format!("\"{value}\""))
                            .collect();
                        lines.push(format!("\t<REQUEST> {}", values.join(" ")));
                    }
                    if roles.holding.as_deref() == name {
                        lines.push("\t<HOLDING>".to_string());
                    }
                }
            }
            InputKind::Tabular(roles) => {
                if roles.status_indicator.is_some() {
                    for (status, marker) in &roles.status_markers {
                        lines.push(format!("\t<{status}> {marker}"));
                    }
                }
                for column in self.columns() {
                    lines.extend(column.metadata_lines(false)?);
                    let name = Some(column.name());
                    if roles.top_contributors.iter().any(|c| c == column.name()) {
                        lines.push("\t<MAXSCORE>".to_string());
                    }
                    if roles.lower_protection_level.as_deref() == name {
                        lines.push("\t<LOWERPL>".to_string());
                    }
                    if roles.upper_protection_level.as_deref() == name {
                        lines.push("\t<UPPERPL>".to_string());
                    }
                    if roles.frequency.as_deref() == name {
                        lines.push("\t<FREQUENCY>".to_string());
                    }
                    if roles.status_indicator.as_deref() == name {
                        lines.push("\t<STATUS>".to_string());
                    }
                }
            }
        }

        let mut text = lines.join("\n");
        text.push('\n');
        Ok(text)
    }

    pub fn write_metadata(&mut self, path: &Path) -> Result<()> {
        let text = self.metadata_text()?;
        fs::write(path, text).map_err(|e| ModelError::io(path, e))?;
        debug!(path = %path.display(), columns = self.columns().len(), "wrote metadata");
        self.set_metadata_path(path);
        Ok(())
    }
}
