//! `--env KEY=VALUE ...`: container environment variables.
//!
//! A bare `KEY` copies the variable from the invoking host.

use rocker_core::extension::{CliOption, ExtensionContext};
use rocker_core::{Extension, ExtensionDescriptor, ExtensionError, Options, RunArgs};

pub const NAME: &str = "env";

/// One `--env` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Assignment {
    Set(String, String),
    FromHost(String),
}

impl Assignment {
    fn parse(raw: &str) -> Result<Self, ExtensionError> {
        let (key, value) = match raw.split_once('=') {
            Some((key, value)) => (key, Some(value)),
            None => (raw, None),
        };
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(ExtensionError::invalid_value(
                NAME,
                raw,
                "expected KEY=VALUE or KEY",
            ));
        }
        Ok(match value {
            Some(value) => Assignment::Set(key.to_string(), value.to_string()),
            None => Assignment::FromHost(key.to_string()),
        })
    }
}

#[derive(Debug)]
pub struct Env {
    assignments: Vec<Assignment>,
}

impl Env {
    pub fn from_options(options: &Options) -> Result<Self, ExtensionError> {
        let assignments = options
            .extension_values(NAME)
            .iter()
            .map(|raw| Assignment::parse(raw))
            .collect::<Result<_, _>>()?;
        Ok(Self { assignments })
    }
}

impl Extension for Env {
    fn name(&self) -> &str {
        NAME
    }

    fn run_contribution(&self, ctx: &ExtensionContext<'_>) -> Result<RunArgs, ExtensionError> {
        let mut args = RunArgs::new();
        for assignment in &self.assignments {
            args = match assignment {
                Assignment::Set(key, value) => args.env(key.clone(), value.clone()),
                Assignment::FromHost(key) => {
                    let value = ctx
                        .host
                        .env(key)
                        .ok_or_else(|| ExtensionError::MissingEnv(key.clone()))?;
                    args.env(key.clone(), value)
                }
            };
        }
        Ok(args)
    }
}

pub fn descriptor() -> ExtensionDescriptor {
    ExtensionDescriptor::builtin(NAME, "Set environment variables in the container", |options: &Options| {
        Ok(Box::new(Env::from_options(options)?) as Box<dyn Extension>)
    })
    .with_options(vec![CliOption::values(
        NAME,
        "Set environment variables (KEY=VALUE, or KEY to copy from the host)",
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rocker_core::{HostInfo, OptionValue};

    fn values(items: &[&str]) -> OptionValue {
        OptionValue::Values(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_assignments_from_values_and_host() {
        let options = Options::new("ubuntu").with_extension(NAME, values(&["A=1", "B=x=y", "TERM"]));
        let host = HostInfo::fixed("alice", 1000, 1000, "/home/alice").with_env("TERM", "xterm");
        let ctx = ExtensionContext::new(&options, &host);

        let args = Env::from_options(&options)
            .unwrap()
            .run_contribution(&ctx)
            .unwrap();
        assert_eq!(
            args,
            RunArgs::new().env("A", "1").env("B", "x=y").env("TERM", "xterm")
        );
    }

    #[test]
    fn test_missing_host_variable() {
        let options = Options::new("ubuntu").with_extension(NAME, values(&["NOPE"]));
        let host = HostInfo::fixed("alice", 1000, 1000, "/home/alice");
        let ctx = ExtensionContext::new(&options, &host);

        let err = Env::from_options(&options)
            .unwrap()
            .run_contribution(&ctx)
            .unwrap_err();
        assert!(matches!(err, ExtensionError::MissingEnv(key) if key == "NOPE"));
    }

    #[test]
    fn test_invalid_assignment_rejected_at_instantiation() {
        let options = Options::new("ubuntu").with_extension(NAME, values(&["=1"]));
        assert!(matches!(
            Env::from_options(&options),
            Err(ExtensionError::InvalidValue { .. })
        ));
    }
}
