use std::{fmt, path::Path, process::Command};

use super::{AdapterError, CaseFiles};

const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// How to launch a simulator for one case: a program plus arguments in which
/// `{input}` and `{output}` are replaced by the case's file paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulatorCommand {
    program: String,
    args: Vec<String>,
}

impl SimulatorCommand {
    /// The plain `binary <input> <output>` convention.
    pub fn binary(path: impl AsRef<Path>) -> Self {
        Self {
            program: path.as_ref().display().to_string(),
            args: vec![INPUT_PLACEHOLDER.to_string(), OUTPUT_PLACEHOLDER.to_string()],
        }
    }

    /// Parses a whitespace separated template such as
    /// `python3 ref.py --in {input} --out {output}`.
    pub fn parse_template(template: &str) -> Result<Self, AdapterError> {
        let invalid = |reason: &str| AdapterError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };
        let mut words = template.split_whitespace().map(str::to_string);
        let program = words.next().ok_or_else(|| invalid("empty command"))?;
        let args: Vec<String> = words.collect();
        for placeholder in [INPUT_PLACEHOLDER, OUTPUT_PLACEHOLDER] {
            if !args.iter().any(|arg| arg.contains(placeholder)) {
                return Err(invalid(&format!("missing {placeholder} placeholder")));
            }
        }
        Ok(Self { program, args })
    }

    pub fn to_command(&self, files: &CaseFiles) -> Command {
        let input = files.input.display().to_string();
        let output = files.output.display().to_string();
        let mut command = Command::new(&self.program);
        command.args(self.args.iter().map(|arg| {
            arg.replace(INPUT_PLACEHOLDER, &input)
                .replace(OUTPUT_PLACEHOLDER, &output)
        }));
        command
    }
}

impl fmt::Display for SimulatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
