use clap::{Arg, Command};

pub const ARG_SECRET: &str = "secret";
pub const ARG_SESSION_STRATEGY: &str = "session-strategy";
pub const ARG_SESSION_MAX_AGE: &str = "session-max-age";
pub const ARG_SESSION_UPDATE_AGE: &str = "session-update-age";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SECRET)
                .short('s')
                .long("secret")
                .help("Cookie encryption secrets, comma separated; the first encrypts, all decrypt")
                .env("ENSALUTI_SECRET")
                .required(true)
                .value_delimiter(',')
                .num_args(1..),
        )
        .arg(
            Arg::new(ARG_SESSION_STRATEGY)
                .long("session-strategy")
                .help("Session strategy: jwt (stateless) or database (adapter-backed)")
                .env("ENSALUTI_SESSION_STRATEGY")
                .default_value("jwt")
                .value_parser(["jwt", "database"]),
        )
        .arg(
            Arg::new(ARG_SESSION_MAX_AGE)
                .long("session-max-age")
                .help("Session lifetime in seconds")
                .env("ENSALUTI_SESSION_MAX_AGE")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new(ARG_SESSION_UPDATE_AGE)
                .long("session-update-age")
                .help("Seconds before a session becomes due for a rolling refresh")
                .env("ENSALUTI_SESSION_UPDATE_AGE")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64).range(0..)),
        )
}
