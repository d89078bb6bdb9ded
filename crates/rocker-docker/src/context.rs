//! Materializes a build spec as a docker build context.

use std::io;
use std::path::Path;

use rocker_core::BuildSpec;

/// Name of the Dockerfile inside the context.
pub const DOCKERFILE: &str = "Dockerfile";

/// Writes the Dockerfile and every context file of `spec` under `dir`.
pub fn write_context(dir: &Path, spec: &BuildSpec) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(DOCKERFILE), spec.dockerfile())?;
    for (relative, contents) in spec.context() {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, contents)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocker_core::extension::{BuildContribution, ExtensionContext};
    use rocker_core::{
        compose_build, Extension, ExtensionError, ExtensionRegistry, HostInfo, Options,
    };

    struct Ships;

    impl Extension for Ships {
        fn name(&self) -> &str {
            "ships"
        }

        fn build_contribution(
            &self,
            _ctx: &ExtensionContext<'_>,
        ) -> Result<BuildContribution, ExtensionError> {
            Ok(BuildContribution::new()
                .instruction("COPY scripts/setup.sh /setup.sh")
                .file("scripts/setup.sh", "echo hi\n"))
        }
    }

    #[test]
    fn test_writes_dockerfile_and_nested_files() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register_builtin("ships", "test", |_: &Options| {
                Ok(Box::new(Ships) as Box<dyn Extension>)
            })
            .unwrap();
        let options = Options::new("alpine:3").enable("ships");
        let host = HostInfo::fixed("alice", 1000, 1000, "/home/alice");
        let active = rocker_core::resolve(&registry, &options).unwrap();
        let spec = compose_build(&ExtensionContext::new(&options, &host), &active).unwrap();

        let dir = tempfile::tempdir().unwrap();
        write_context(dir.path(), &spec).unwrap();

        let dockerfile = std::fs::read_to_string(dir.path().join(DOCKERFILE)).unwrap();
        assert!(dockerfile.starts_with("FROM alpine:3\n"));
        assert!(dockerfile.contains("COPY scripts/setup.sh /setup.sh\n"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("scripts/setup.sh")).unwrap(),
            "echo hi\n"
        );
    }
}
