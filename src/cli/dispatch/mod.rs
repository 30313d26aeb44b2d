use crate::cli::{
    actions::{
        server::{Args, SecretConfig, StoreKind},
        Action,
    },
    commands::{
        auth::{ARG_JWT_SECRET_ENV, ARG_JWT_SECRET_FILE},
        ARG_CORS_ORIGINS, ARG_DSN, ARG_MIGRATE, ARG_PORT, ARG_STORE,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(3000);

    let store = match matches.get_one::<String>(ARG_STORE).map(String::as_str) {
        Some("memory") => StoreKind::Memory,
        _ => {
            let dsn = matches
                .get_one::<String>(ARG_DSN)
                .cloned()
                .context("missing required argument: --dsn (or DATABASE_URL)")?;
            Url::parse(&dsn).context("invalid database connection string")?;
            StoreKind::Postgres {
                dsn: SecretString::from(dsn),
            }
        }
    };

    let secret = match matches.get_one::<String>(ARG_JWT_SECRET_FILE) {
        Some(path) => SecretConfig::File(PathBuf::from(path)),
        None => SecretConfig::Env(
            matches
                .get_one::<String>(ARG_JWT_SECRET_ENV)
                .cloned()
                .unwrap_or_else(|| "JWT_SECRET".to_string()),
        ),
    };

    let cors_origins = matches
        .get_many::<String>(ARG_CORS_ORIGINS)
        .map(|values| {
            values
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        store,
        migrate: matches.get_flag(ARG_MIGRATE),
        secret,
        cors_origins,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    const CLEAN_ENV: [(&str, Option<&str>); 7] = [
        ("AFRIDAUTH_PORT", None),
        ("DATABASE_URL", None),
        ("AFRIDAUTH_STORE", None),
        ("AFRIDAUTH_MIGRATE", None),
        ("AFRIDAUTH_CORS_ORIGINS", None),
        ("AFRIDAUTH_JWT_SECRET_ENV", None),
        ("AFRIDAUTH_JWT_SECRET_FILE", None),
    ];

    fn dispatch(args: &[&str]) -> Result<Args> {
        let matches = commands::new().try_get_matches_from(args.iter().copied())?;
        match handler(&matches)? {
            Action::Server(args) => Ok(args),
        }
    }

    #[test]
    fn postgres_requires_dsn() {
        temp_env::with_vars(CLEAN_ENV, || {
            assert!(dispatch(&["afridauth"]).is_err());
            assert!(dispatch(&["afridauth", "--dsn", "not a url"]).is_err());
        });
    }

    #[test]
    fn postgres_with_dsn() {
        temp_env::with_vars(CLEAN_ENV, || {
            let args = dispatch(&[
                "afridauth",
                "--dsn",
                "postgres://user:pw@localhost:5432/afridauth",
                "--migrate",
            ]);
            assert!(args.is_ok());
            if let Ok(args) = args {
                assert!(matches!(args.store, StoreKind::Postgres { .. }));
                assert!(args.migrate);
                assert_eq!(args.port, 3000);
                assert_eq!(args.secret, SecretConfig::Env("JWT_SECRET".to_string()));
            }
        });
    }

    #[test]
    fn memory_store_needs_no_dsn() {
        temp_env::with_vars(CLEAN_ENV, || {
            let args = dispatch(&["afridauth", "--store", "memory", "--port", "8081"]);
            assert!(args.is_ok());
            if let Ok(args) = args {
                assert!(matches!(args.store, StoreKind::Memory));
                assert_eq!(args.port, 8081);
            }
        });
    }

    #[test]
    fn secret_file_takes_over() {
        temp_env::with_vars(CLEAN_ENV, || {
            let args = dispatch(&[
                "afridauth",
                "--store",
                "memory",
                "--jwt-secret-file",
                "/run/secrets/jwt",
            ]);
            assert!(args.is_ok());
            if let Ok(args) = args {
                assert_eq!(
                    args.secret,
                    SecretConfig::File(PathBuf::from("/run/secrets/jwt"))
                );
            }
        });
    }

    #[test]
    fn cors_origins_are_trimmed() {
        temp_env::with_vars(CLEAN_ENV, || {
            temp_env::with_var(
                "AFRIDAUTH_CORS_ORIGINS",
                Some("http://localhost:5173, https://traders.kazini.africa"),
                || {
                    let args = dispatch(&["afridauth", "--store", "memory"]);
                    assert!(args.is_ok());
                    if let Ok(args) = args {
                        assert_eq!(
                            args.cors_origins,
                            vec![
                                "http://localhost:5173".to_string(),
                                "https://traders.kazini.africa".to_string()
                            ]
                        );
                    }
                },
            );
        });
    }
}
