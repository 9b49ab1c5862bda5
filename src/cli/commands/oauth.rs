use clap::{Arg, Command};

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_BASE_PATH: &str = "base-path";
pub const ARG_PROVIDERS: &str = "providers";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .short('u')
                .long("base-url")
                .help("Public origin of this deployment, e.g. https://id.example.com")
                .env("ENSALUTI_BASE_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_BASE_PATH)
                .long("base-path")
                .help("Path prefix for the engine routes")
                .env("ENSALUTI_BASE_PATH")
                .default_value("/auth"),
        )
        .arg(
            Arg::new(ARG_PROVIDERS)
                .long("providers")
                .help("Path to the providers JSON file")
                .env("ENSALUTI_PROVIDERS"),
        )
}
