//! oc-client: a small client for the `oc` command-line tool.
//! Runs `oc cabbages` without a shell, optionally adding `--username`/`--password`
//! taken from explicit arguments or from a shell-script credentials file
//! (`~/.ocrc`), and decodes the JSON the CLI prints.

pub mod client;
pub mod config;
pub mod credentials;
pub mod decode;
pub mod error;
pub mod invoker;

pub use client::{Client, cabbages};
pub use config::{ClientConfig, ShellConfig, default_credentials_path};
pub use credentials::{
    Credentials, FileCredentials, Password, ShellExtractor, UsernamePassword,
    get_credentials_exported_by,
};
pub use decode::parse_json;
pub use error::{OcError, Result};
pub use invoker::{CommandRunner, command_with_credentials, stdout_of};
