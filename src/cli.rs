//! Minimal CLI parsing for the matcher binary.

use std::env;

use anyhow::{Result, bail};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub strict: bool,
    pub base_url_override: Option<String>,
    pub paths: Vec<String>,
}

impl CliOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--strict" => options.strict = true,
                "--base-url" => match args.next() {
                    Some(value) => options.base_url_override = Some(value),
                    None => bail!("--base-url requires a value"),
                },
                "--" => options.paths.extend(args.by_ref()),
                _ if arg.starts_with("--base-url=") => {
                    if let Some(value) = arg.split_once('=').map(|(_, v)| v) {
                        options.base_url_override = Some(value.to_string());
                    }
                }
                _ => options.paths.push(arg),
            }
        }
        Ok(options)
    }
}
