//! `--user`: run as the invoking user instead of root.
//!
//! The build fragment recreates the host user (same uid, gid, name and home)
//! inside the image and switches to it; the run contribution pins the same
//! identity on the container. This extension is `AppliedLast`: everything
//! other extensions install still runs as root, and no other extension can
//! override the final user.
//!
//! `--user-override-name NAME` uses a different user name inside the image.

use log::debug;
use rocker_core::extension::{BuildContribution, CliOption, ExtensionContext};
use rocker_core::{
    Category, Extension, ExtensionDescriptor, ExtensionError, Options, RunArgs,
};

pub const NAME: &str = "user";
const OVERRIDE_NAME: &str = "user-override-name";

/// Build-context path of the user setup script.
const SETUP_SCRIPT: &str = "rocker-user-setup.sh";

const SETUP_SCRIPT_BODY: &str = r#"#!/bin/sh
set -e
uid="$1"
gid="$2"
name="$3"
home="$4"

# userdel can drop the removed user's primary group; set groups up afterwards
for existing in "$(getent passwd "$uid" | cut -d: -f1)" "$(getent passwd "$name" | cut -d: -f1)"; do
    if [ -n "$existing" ] && getent passwd "$existing" >/dev/null; then
        userdel "$existing"
    fi
done
if ! getent group "$gid" >/dev/null; then
    if getent group "$name" >/dev/null; then
        groupmod -g "$gid" "$name"
    else
        groupadd -g "$gid" "$name"
    fi
fi
useradd --no-log-init -u "$uid" -g "$gid" -d "$home" -m -s /bin/sh "$name"
"#;

#[derive(Debug, Default)]
pub struct User {
    name_override: Option<String>,
}

impl User {
    pub fn from_options(options: &Options) -> Result<Self, ExtensionError> {
        let name_override = match options.extension_values(OVERRIDE_NAME) {
            [] => None,
            [name] if is_valid_user_name(name) => Some(name.clone()),
            [name] => {
                return Err(ExtensionError::invalid_value(
                    OVERRIDE_NAME,
                    name,
                    "user names must match [a-z_][a-z0-9_-]*",
                ))
            }
            [_, extra, ..] => {
                return Err(ExtensionError::invalid_value(
                    OVERRIDE_NAME,
                    extra,
                    "only one user name may be given",
                ))
            }
        };
        Ok(Self { name_override })
    }

    fn user_name<'a>(&'a self, ctx: &'a ExtensionContext<'_>) -> &'a str {
        self.name_override.as_deref().unwrap_or(&ctx.host.user)
    }

    fn home(&self, ctx: &ExtensionContext<'_>) -> String {
        match &self.name_override {
            Some(name) => format!("/home/{}", name),
            None => ctx.host.home_str(),
        }
    }
}

impl Extension for User {
    fn name(&self) -> &str {
        NAME
    }

    fn build_contribution(
        &self,
        ctx: &ExtensionContext<'_>,
    ) -> Result<BuildContribution, ExtensionError> {
        let host = ctx.host;
        if host.uid == 0 {
            debug!("invoking user is root; no user to create");
            return Ok(BuildContribution::new());
        }
        let name = self.user_name(ctx);
        if !is_valid_user_name(name) {
            return Err(ExtensionError::invalid_value(
                NAME,
                name,
                "host user name cannot be used inside the image; pass --user-override-name",
            ));
        }
        let home = self.home(ctx);
        Ok(BuildContribution::new()
            .file(SETUP_SCRIPT, SETUP_SCRIPT_BODY)
            .instruction(format!("COPY {} /tmp/{}", SETUP_SCRIPT, SETUP_SCRIPT))
            .instruction(format!(
                "RUN sh /tmp/{script} {uid} {gid} {name} {home} && rm /tmp/{script}",
                script = SETUP_SCRIPT,
                uid = host.uid,
                gid = host.gid,
                name = sh_quote(name),
                home = sh_quote(&home),
            ))
            .instruction(format!("USER {}:{}", host.uid, host.gid))
            .instruction(format!("WORKDIR {}", home)))
    }

    fn run_contribution(&self, ctx: &ExtensionContext<'_>) -> Result<RunArgs, ExtensionError> {
        let host = ctx.host;
        let (name, home) = if host.uid == 0 {
            ("root".to_string(), "/root".to_string())
        } else {
            (self.user_name(ctx).to_string(), self.home(ctx))
        };
        Ok(RunArgs::new()
            .user(format!("{}:{}", host.uid, host.gid))
            .env("HOME", home)
            .env("USER", name))
    }
}

fn sh_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

fn is_valid_user_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= 32
        && (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

pub fn descriptor() -> ExtensionDescriptor {
    ExtensionDescriptor::builtin(NAME, "Run as the invoking user", |options: &Options| {
        Ok(Box::new(User::from_options(options)?) as Box<dyn Extension>)
    })
    .with_category(Category::AppliedLast)
    .with_options(vec![
        CliOption::flag(NAME, "Run as the invoking user (uid, gid, name and home)"),
        CliOption::values(OVERRIDE_NAME, "User name to use inside the container"),
    ])
}
