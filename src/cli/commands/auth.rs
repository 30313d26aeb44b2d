use clap::{Arg, Command};

pub const ARG_JWT_SECRET_ENV: &str = "jwt-secret-env";
pub const ARG_JWT_SECRET_FILE: &str = "jwt-secret-file";

/// Where the token signing secret is read from.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET_ENV)
                .long(ARG_JWT_SECRET_ENV)
                .help("Environment variable holding the token signing secret")
                .long_help(
                    "Environment variable holding the token signing secret. It is read on every token operation; the process fails to start when it is unset or empty.",
                )
                .env("AFRIDAUTH_JWT_SECRET_ENV")
                .default_value("JWT_SECRET"),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET_FILE)
                .long(ARG_JWT_SECRET_FILE)
                .help("File holding the token signing secret, re-read on every token operation")
                .env("AFRIDAUTH_JWT_SECRET_FILE")
                .conflicts_with(ARG_JWT_SECRET_ENV),
        )
}
