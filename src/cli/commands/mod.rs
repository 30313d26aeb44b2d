pub mod auth;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_STORE: &str = "store";
pub const ARG_MIGRATE: &str = "migrate";
pub const ARG_CORS_ORIGINS: &str = "cors-origins";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("afridauth")
        .about("Account registration, login and bearer-token access gate")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("3000")
                .env("AFRIDAUTH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long(ARG_DSN)
                .help("Database connection string, required with --store postgres")
                .env("DATABASE_URL"),
        )
        .arg(
            Arg::new(ARG_STORE)
                .long(ARG_STORE)
                .help("Account store backend")
                .long_help(
                    "Account store backend. `memory` keeps accounts in process and loses them on exit; use it for local development only.",
                )
                .env("AFRIDAUTH_STORE")
                .default_value("postgres")
                .value_parser(["postgres", "memory"]),
        )
        .arg(
            Arg::new(ARG_MIGRATE)
                .long(ARG_MIGRATE)
                .help("Apply the bundled schema before serving")
                .env("AFRIDAUTH_MIGRATE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGINS)
                .long(ARG_CORS_ORIGINS)
                .help("Comma-separated origins allowed by CORS (default: http://localhost:5173)")
                .env("AFRIDAUTH_CORS_ORIGINS")
                .value_delimiter(',')
                .action(ArgAction::Append),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}
