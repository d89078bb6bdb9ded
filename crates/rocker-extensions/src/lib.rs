//! Built-in rocker extensions.
//!
//! | name | category | effect |
//! |------|----------|--------|
//! | `env` | normal | sets container environment variables (`--env KEY=VALUE ...`) |
//! | `home` | normal | mounts the invoking user's home directory at the same path |
//! | `ssh` | normal | forwards the host ssh agent |
//! | `x11` | normal | forwards the X11 display |
//! | `user` | applied last | recreates the invoking user inside the image and switches to it |
//!
//! The binary registers [`builtin_descriptors`] before discovering manifest
//! extensions, so built-ins always come first in discovery order.

pub mod env;
pub mod home;
pub mod ssh;
pub mod user;
pub mod x11;

use rocker_core::ExtensionDescriptor;

/// Returns the built-in extension descriptors in registration order.
pub fn builtin_descriptors() -> Vec<ExtensionDescriptor> {
    vec![
        env::descriptor(),
        home::descriptor(),
        ssh::descriptor(),
        x11::descriptor(),
        user::descriptor(),
    ]
}
