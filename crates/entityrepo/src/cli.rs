//! Command-line surface: argument types, parsing and command execution.

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use thiserror::Error;

use entityrepo_core::repository::{EntityHooks, EntityRepository, PutOptions};
use entityrepo_core::storage::{Key, PartialUpdate, RepositoryError, ScanParams, StoreClient};

/// entityrepo - inspect and edit entity tables through their repositories
#[derive(Parser, Debug)]
#[command(name = "entityrepo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Entity domain to operate on
    #[arg(long, short, value_enum, env = "ENTITYREPO_DOMAIN")]
    pub domain: Domain,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", env = "LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Domain {
    Sites,
    Artifacts,
    Sessions,
    ContentCache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Read one entity
    Get {
        /// Key field as name=value (repeat for composite keys)
        #[arg(long = "key", required = true)]
        key: Vec<String>,
    },
    /// Write one entity given as JSON
    Put {
        entity: String,
        /// Fail if an entity with the same key exists
        #[arg(long)]
        no_overwrite: bool,
    },
    /// Set fields of one entity
    Update {
        #[arg(long = "key", required = true)]
        key: Vec<String>,
        /// Field assignment as name=<json>; non-JSON text is taken as a string
        #[arg(long = "set")]
        set: Vec<String>,
        /// Field to set to null
        #[arg(long = "unset")]
        unset: Vec<String>,
    },
    /// Delete one entity, printing it as it was
    Delete {
        #[arg(long = "key", required = true)]
        key: Vec<String>,
    },
    /// List entities
    Scan {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Read many entities
    BatchGet {
        /// Key as name=value[,name=value] (repeat per entity)
        #[arg(long = "key", required = true)]
        keys: Vec<String>,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid key field '{0}', expected name=value")]
    InvalidKeyField(String),

    #[error("Invalid assignment '{0}', expected name=<json>")]
    InvalidAssignment(String),

    #[error("Invalid entity JSON: {0}")]
    InvalidEntity(#[from] serde_json::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Parses `name=value` pairs into a key. Values are strings.
pub fn parse_key<S: AsRef<str>>(fields: &[S]) -> Result<Key, CliError> {
    fields
        .iter()
        .map(|field| {
            let field = field.as_ref();
            match field.split_once('=') {
                Some((name, value)) if !name.trim().is_empty() => {
                    Ok((name.trim().to_string(), Value::String(value.to_string())))
                }
                _ => Err(CliError::InvalidKeyField(field.to_string())),
            }
        })
        .collect()
}

/// Parses a comma-separated key group such as `siteId=a,artifactId=b`.
pub fn parse_key_group(group: &str) -> Result<Key, CliError> {
    let fields: Vec<&str> = group.split(',').collect();
    parse_key(&fields)
}

/// Builds a partial update from `--set` and `--unset` arguments.
pub fn parse_updates(set: &[String], unset: &[String]) -> Result<PartialUpdate, CliError> {
    let mut updates = PartialUpdate::new();
    for assignment in set {
        let (name, raw) = assignment
            .split_once('=')
            .filter(|(name, _)| !name.trim().is_empty())
            .ok_or_else(|| CliError::InvalidAssignment(assignment.clone()))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        updates.insert(name.trim().to_string(), Some(value));
    }
    for name in unset {
        updates.insert(name.trim().to_string(), Some(Value::Null));
    }
    Ok(updates)
}

/// Runs one command against one repository and returns the JSON to print.
pub async fn execute<H, S>(
    repo: &EntityRepository<H, S>,
    command: &Command,
) -> Result<Value, CliError>
where
    H: EntityHooks,
    S: StoreClient + ?Sized,
{
    let output = match command {
        Command::Get { key } => {
            let entity = repo.get(&parse_key(key)?).await?;
            serde_json::to_value(entity)?
        }
        Command::Put {
            entity,
            no_overwrite,
        } => {
            let entity: H::Entity = serde_json::from_str(entity)?;
            let options = if *no_overwrite {
                PutOptions::no_overwrite()
            } else {
                PutOptions::default()
            };
            repo.put(&entity, options).await?;
            serde_json::to_value(entity)?
        }
        Command::Update { key, set, unset } => {
            let updates = parse_updates(set, unset)?;
            let entity = repo.update(&parse_key(key)?, &updates).await?;
            serde_json::to_value(entity)?
        }
        Command::Delete { key } => {
            let previous = repo.delete(&parse_key(key)?).await?;
            serde_json::to_value(previous)?
        }
        Command::Scan { limit } => {
            let params = limit.map(|limit| ScanParams::default().limit(limit));
            let page = repo.scan_page(params.as_ref()).await?;
            json!({
                "items": serde_json::to_value(page.items)?,
                "lastEvaluatedKey": page.last_evaluated_key,
            })
        }
        Command::BatchGet { keys } => {
            let keys = keys
                .iter()
                .map(|group| parse_key_group(group))
                .collect::<Result<Vec<_>, _>>()?;
            serde_json::to_value(repo.batch_get(&keys).await?)?
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entityrepo_core::storage::key_of;

    #[test]
    fn test_parse_key() {
        let key = parse_key(&["siteId=louvre", "artifactId=a=1"]).unwrap();
        assert_eq!(key, key_of([("siteId", "louvre"), ("artifactId", "a=1")]));

        assert!(matches!(
            parse_key(&["siteId"]),
            Err(CliError::InvalidKeyField(_))
        ));
        assert!(matches!(parse_key(&["=x"]), Err(CliError::InvalidKeyField(_))));
    }

    #[test]
    fn test_parse_key_group() {
        let key = parse_key_group("siteId=louvre,artifactId=a1").unwrap();
        assert_eq!(key, key_of([("siteId", "louvre"), ("artifactId", "a1")]));
    }

    #[test]
    fn test_parse_updates() {
        let updates = parse_updates(
            &[
                "languages=[\"en\",\"fr\"]".to_string(),
                "name=Louvre Museum".to_string(),
            ],
            &["description".to_string()],
        )
        .unwrap();

        assert_eq!(updates["languages"], Some(json!(["en", "fr"])));
        assert_eq!(updates["name"], Some(json!("Louvre Museum")));
        assert_eq!(updates["description"], Some(Value::Null));

        assert!(matches!(
            parse_updates(&["oops".to_string()], &[]),
            Err(CliError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "entityrepo",
            "--domain",
            "content-cache",
            "batch-get",
            "--key",
            "contentKey=a",
            "--key",
            "contentKey=b",
        ])
        .unwrap();

        assert_eq!(cli.domain, Domain::ContentCache);
        assert_eq!(
            cli.command,
            Command::BatchGet {
                keys: vec!["contentKey=a".to_string(), "contentKey=b".to_string()]
            }
        );
    }

    #[cfg(feature = "inmemory")]
    mod execution {
        use super::*;
        use crate::config::Config;
        use crate::repositories::Repositories;

        #[tokio::test]
        async fn test_put_update_get_delete() {
            let repos = Repositories::in_memory(&Config::from_lookup(|_| None)).unwrap();
            let site = json!({
                "siteId": "louvre",
                "name": "Louvre",
                "languages": ["fr"],
                "createdAt": "2024-06-15T10:00:00Z",
                "updatedAt": "2024-06-15T10:00:00Z"
            });

            execute(
                &repos.sites,
                &Command::Put {
                    entity: site.to_string(),
                    no_overwrite: true,
                },
            )
            .await
            .unwrap();

            let updated = execute(
                &repos.sites,
                &Command::Update {
                    key: vec!["siteId=louvre".to_string()],
                    set: vec!["description=Paris".to_string()],
                    unset: vec![],
                },
            )
            .await
            .unwrap();
            assert_eq!(updated["description"], "Paris");

            let deleted = execute(
                &repos.sites,
                &Command::Delete {
                    key: vec!["siteId=louvre".to_string()],
                },
            )
            .await
            .unwrap();
            assert_eq!(deleted["name"], "Louvre");

            let missing = execute(
                &repos.sites,
                &Command::Get {
                    key: vec!["siteId=louvre".to_string()],
                },
            )
            .await
            .unwrap();
            assert_eq!(missing, Value::Null);
        }

        #[tokio::test]
        async fn test_invalid_entity_is_rejected_before_io() {
            let repos = Repositories::in_memory(&Config::from_lookup(|_| None)).unwrap();

            let err = execute(
                &repos.sites,
                &Command::Put {
                    entity: "{not json".to_string(),
                    no_overwrite: false,
                },
            )
            .await
            .unwrap_err();

            assert!(matches!(err, CliError::InvalidEntity(_)));
        }

        #[tokio::test]
        async fn test_scan_reports_continuation() {
            let repos = Repositories::in_memory(&Config::from_lookup(|_| None)).unwrap();
            for id in ["a", "b", "c"] {
                let site = json!({
                    "siteId": id,
                    "name": id,
                    "languages": ["en"],
                    "createdAt": "2024-06-15T10:00:00Z",
                    "updatedAt": "2024-06-15T10:00:00Z"
                });
                execute(
                    &repos.sites,
                    &Command::Put {
                        entity: site.to_string(),
                        no_overwrite: false,
                    },
                )
                .await
                .unwrap();
            }

            let page = execute(&repos.sites, &Command::Scan { limit: Some(2) })
                .await
                .unwrap();

            assert_eq!(page["items"].as_array().map(Vec::len), Some(2));
            assert_eq!(page["lastEvaluatedKey"], json!({"siteId": "b"}));
        }
    }
}
