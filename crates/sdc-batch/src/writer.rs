//! Streaming writer for batch files.

use std::io::{self, Write};

use crate::command::BatchCommand;

/// Writes one command per line to any [`Write`] sink.
///
/// ```
/// use sdc_batch::{BatchCommand, BatchWriter};
///
/// let mut writer = BatchWriter::new(Vec::new());
/// writer.write_command(&BatchCommand::ReadMicrodata).unwrap();
/// let bytes = writer.finish().unwrap();
/// assert_eq!(bytes, b"<READMICRODATA>\n");
/// ```
pub struct BatchWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> BatchWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write_command(&mut self, command: &BatchCommand) -> io::Result<()> {
        writeln!(self.inner, "{command}")?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all<'a, I>(&mut self, commands: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a BatchCommand>,
    {
        for command in commands {
            self.write_command(command)?;
        }
        Ok(())
    }

    /// Number of commands written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes and hands back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Renders commands as batch file text.
pub fn render_batch(commands: &[BatchCommand]) -> String {
    let mut text = String::new();
    for command in commands {
        text.push_str(&command.to_string());
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use sdc_model::{Response, SuppressMethod, Suppression};

    use super::*;
    use crate::command::CSV_TABLE_KIND;

    #[test]
    fn writes_a_full_script() {
        let commands = vec![
            BatchCommand::Logbook("log.txt".into()),
            BatchCommand::VersionInfo("version.txt".into()),
            BatchCommand::OpenMicrodata("microdata.csv".into()),
            BatchCommand::OpenMetadata("metadata.rda".into()),
            BatchCommand::SpecifyTable {
                explanatory: vec!["sbi".into(), "gk".into()],
                response: Response::Variable("income".into()),
                shadow: Some("income".into()),
                cost: Some(sdc_model::Cost::Variable("income".into())),
                lambda: None,
            },
            BatchCommand::SafetyRule(vec!["NK(3, 70)".into()]),
            BatchCommand::ReadMicrodata,
            BatchCommand::Suppress {
                table: 1,
                suppression: Suppression::new(SuppressMethod::Hypercube),
            },
            BatchCommand::WriteTable {
                table: 1,
                kind: CSV_TABLE_KIND,
                options: vec![("AS".into(), true)],
                path: "table_clean.csv".into(),
            },
        ];

        let mut writer = BatchWriter::new(Vec::new());
        writer.write_all(&commands).unwrap();
        assert_eq!(writer.written(), 9);
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();

        let expected = [
            "<LOGBOOK>\t\"log.txt\"",
            "<VERSIONINFO>\t\"version.txt\"",
            "<OPENMICRODATA>\t\"microdata.csv\"",
            "<OPENMETADATA>\t\"metadata.rda\"",
            "<SPECIFYTABLE>\t\"sbi\"\"gk\"|\"income\"|\"income\"|\"income\"",
            "<SAFETYRULE>\tNK(3, 70)",
            "<READMICRODATA>",
            "<SUPPRESS>\tGH(1)",
            "<WRITETABLE>\t(1, 2, AS+, \"table_clean.csv\")",
        ];
        assert_eq!(text.lines().collect::<Vec<_>>(), expected);
        assert_eq!(render_batch(&commands), text);
    }
}
