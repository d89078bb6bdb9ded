//! Tests for the extension contract and manifests.

use pretty_assertions::assert_eq;

use super::*;
use crate::host::HostInfo;
use crate::options::Options;
use crate::run::{Mount, RunArgs};

fn host() -> HostInfo {
    HostInfo::fixed("alice", 1000, 1000, "/home/alice").with_cwd("/work/project")
}

// =========================================================================
// Manifest validation tests
// =========================================================================

#[test]
fn test_valid_extension_names() {
    for name in ["x11", "git-config", "cuda_cache", "nv2"] {
        assert!(is_valid_extension_name(name), "{} should be valid", name);
    }
    for name in ["", "a", "Git", "2fast", "has space", "trailing-", "trailing_"] {
        assert!(!is_valid_extension_name(name), "{} should be invalid", name);
    }
    assert!(!is_valid_extension_name(&"a".repeat(65)));
}

#[test]
fn test_context_paths() {
    assert!(is_valid_context_path("entrypoint.sh"));
    assert!(is_valid_context_path("scripts/setup.sh"));
    assert!(!is_valid_context_path(""));
    assert!(!is_valid_context_path("Dockerfile"));
    assert!(!is_valid_context_path("Dockerfile/inner"));
    assert!(is_valid_context_path("Dockerfile.d/extra"));
    assert!(!is_valid_context_path("/etc/passwd"));
    assert!(!is_valid_context_path("../outside"));
    assert!(!is_valid_context_path("./setup.sh"));
}

#[test]
fn test_validate_collects_all_errors() {
    let mut manifest = ExtensionManifest::new("network", "one");
    manifest
        .build
        .files
        .insert("/abs".to_string(), String::new());

    let errors = validate_extension_manifest(&manifest).unwrap_err();
    assert_eq!(
        errors,
        vec![
            ManifestValidationError::ReservedName("network".to_string()),
            ManifestValidationError::InvalidVersion("one".to_string()),
            ManifestValidationError::InvalidFilePath("/abs".to_string()),
        ]
    );
}

#[test]
fn test_validate_rejects_empty_manifest() {
    let manifest = ExtensionManifest::new("nothing", "1.0.0");
    assert_eq!(
        validate_extension_manifest(&manifest),
        Err(vec![ManifestValidationError::NoContribution])
    );
}

#[test]
fn test_manifest_defaults() {
    let manifest = ExtensionManifest::from_json(
        r#"{"name": "gpu", "version": "1.2", "run": {"devices": ["/dev/dri"]}}"#,
    )
    .unwrap();
    assert_eq!(manifest.category, Category::Normal);
    assert_eq!(manifest.help(), "Enable the gpu extension");
    assert!(manifest.build.instructions.is_empty());
    assert!(validate_extension_manifest(&manifest).is_ok());
}

#[test]
fn test_manifest_category_parses() {
    let manifest = ExtensionManifest::from_json(
        r#"{"name": "fixuid", "version": "1.0.0", "category": "applied_last",
            "build": {"instructions": ["USER {uid}"]}}"#,
    )
    .unwrap();
    assert_eq!(manifest.category, Category::AppliedLast);
    let descriptor = ExtensionDescriptor::from_manifest(manifest, None);
    assert_eq!(descriptor.category(), Category::AppliedLast);
}

// =========================================================================
// Manifest extension tests
// =========================================================================

#[test]
fn test_manifest_extension_expands_placeholders() {
    let manifest = ExtensionManifest::from_json(
        r#"{
            "name": "workspace",
            "version": "1.0.0",
            "build": {
                "instructions": ["RUN mkdir -p {home}/ws", "COPY setup.sh /setup.sh"],
                "files": {"setup.sh": "echo {user}"}
            },
            "run": {
                "volumes": ["{cwd}:{home}/ws"],
                "env": {"WS_OWNER": "{uid}:{gid}"},
                "workdir": "{home}/ws"
            }
        }"#,
    )
    .unwrap();
    let descriptor = ExtensionDescriptor::from_manifest(manifest, None);
    let options = Options::new("ubuntu").enable("workspace");
    let host = host();
    let ctx = ExtensionContext::new(&options, &host);
    let extension = descriptor.instantiate(&options).unwrap();

    let build = extension.build_contribution(&ctx).unwrap();
    assert_eq!(
        build.instructions,
        vec!["RUN mkdir -p /home/alice/ws", "COPY setup.sh /setup.sh"]
    );
    assert_eq!(build.files.get("setup.sh").unwrap(), b"echo alice");

    let run = extension.run_contribution(&ctx).unwrap();
    assert_eq!(
        run,
        RunArgs::new()
            .volume(Mount::new("/work/project", "/home/alice/ws"))
            .env("WS_OWNER", "1000:1000")
            .workdir("/home/alice/ws")
    );
}

// =========================================================================
// Descriptor tests
// =========================================================================

#[test]
fn test_builtin_descriptor_defaults() {
    struct Quiet;
    impl Extension for Quiet {
        fn name(&self) -> &str {
            "quiet-ext"
        }
    }

    let descriptor = ExtensionDescriptor::builtin("quiet-ext", "Does nothing", |_: &Options| {
        Ok(Box::new(Quiet) as Box<dyn Extension>)
    });
    assert_eq!(descriptor.category(), Category::Normal);
    assert_eq!(
        descriptor.register_options(),
        [CliOption::flag("quiet-ext", "Does nothing")]
    );
    assert!(descriptor.manifest_path().is_none());
    assert!(matches!(descriptor.source(), ExtensionSource::Builtin(_)));

    let options = Options::new("ubuntu");
    let host = host();
    let ctx = ExtensionContext::new(&options, &host);
    let extension = descriptor.instantiate(&options).unwrap();
    assert!(extension.build_contribution(&ctx).unwrap().is_empty());
    assert!(extension.run_contribution(&ctx).unwrap().is_empty());
}

#[test]
fn test_activation_option_lookup() {
    let descriptor = ExtensionDescriptor::builtin("user", "Match the host user", |_: &Options| {
        Err(crate::error::ExtensionError::message("unused"))
    })
    .with_options(vec![
        CliOption::flag("user", "Match the host user"),
        CliOption::values("user-override-name", "Override the user name"),
    ]);
    let activation = descriptor.activation_option().unwrap();
    assert_eq!(activation.kind, OptionKind::Flag);
    assert_eq!(descriptor.register_options().len(), 2);
}
