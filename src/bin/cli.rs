//! dbfacade CLI - Main entry point for CLI binary
//!
//! This binary provides the `dbfacade` CLI tool for querying both stores.

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use dbfacade_lib::engine::{
    cli::{extra_record, formatter::CliFormatter, Cli, Commands, ConfigAction, DocAction, OutputFormat, SqlAction},
    config::{Config, DocumentStoreConfig, RelationalStoreConfig},
    nosql::{storage::cluster_path, DocumentBody, FileCluster, Meta, MutationResult},
    DocumentFetchResult, DocumentStoreClient, FetchMode, RelationalStoreClient,
};
use serde_json::{json, Value};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run_cli(cli) {
        CliFormatter::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Logs go to stderr so JSON output on stdout stays clean
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path()?;
    let json_output = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Config { action } => cmd_config(action, &config_path, json_output),
        Commands::Sql { password, action } => {
            let mut settings = load_config(&config_path)?
                .relational
                .ok_or_else(|| anyhow!("no relational store configured in {}", config_path.display()))?;
            if let Some(password) = password {
                settings.password = password;
            }
            cmd_sql(action, &settings, json_output)
        }
        Commands::Doc { password, action } => {
            let mut settings = load_config(&config_path)?
                .document
                .ok_or_else(|| anyhow!("no document store configured in {}", config_path.display()))?;
            if let Some(password) = password {
                settings.password = password;
            }
            cmd_doc(action, &settings, json_output)
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| "run `dbfacade config init` first")
}

fn cmd_config(action: ConfigAction, config_path: &Path, json: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init { data_dir, force } => {
            if config_path.exists() && !force {
                bail!("config already exists: {} (use --force)", config_path.display());
            }
            let data_dir = match data_dir {
                Some(dir) => dir,
                None => config_path
                    .parent()
                    .map(|p| p.join("data"))
                    .ok_or_else(|| anyhow!("cannot derive a data directory"))?,
            };
            std::fs::create_dir_all(data_dir.join("sql"))?;

            let config = Config::default_local(&data_dir);
            config.save(config_path)?;

            if json {
                println!("{}", json!({ "success": true, "config": config_path.display().to_string() }));
            } else {
                CliFormatter::success(&format!("Wrote {}", config_path.display()));
                CliFormatter::kv("data", &data_dir.display().to_string());
            }
        }
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                CliFormatter::header("Config");
                CliFormatter::kv("file", &config_path.display().to_string());
                if let Some(doc) = &config.document {
                    CliFormatter::kv("document url", &doc.url);
                    CliFormatter::kv("document user", &doc.username);
                    CliFormatter::kv("bucket", doc.bucket.as_deref().unwrap_or("-"));
                }
                if let Some(sql) = &config.relational {
                    CliFormatter::kv("relational url", &sql.url);
                    CliFormatter::kv("relational user", &sql.username);
                    CliFormatter::kv("database", sql.database.as_deref().unwrap_or("-"));
                }
            }
        }
    }
    Ok(())
}

fn cmd_sql(action: SqlAction, settings: &RelationalStoreConfig, json: bool) -> anyhow::Result<()> {
    match action {
        SqlAction::Fetch { sql, database, extra } => {
            let database = database.or_else(|| settings.database.clone());
            let mut client = RelationalStoreClient::connect(
                &settings.url,
                &settings.username,
                &settings.password,
                database.as_deref(),
            )?;

            let result = client.fetch_all(&sql)?;
            let extra = extra_record(&extra);
            let extra = (!extra.is_empty()).then_some(&extra);
            client.close()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.to_json(extra))?);
            } else {
                CliFormatter::records(&result.to_records(extra));
                CliFormatter::info(&format!("{} row(s)", result.row_count()));
            }
        }
    }
    Ok(())
}

fn cmd_doc(action: DocAction, settings: &DocumentStoreConfig, json: bool) -> anyhow::Result<()> {
    let configured_bucket = settings.bucket.as_deref();

    match action {
        DocAction::Init { bucket } => {
            let path = cluster_path(&settings.url);
            let cluster = if Meta::exists(&path) {
                FileCluster::connect(&settings.url, &settings.username, &settings.password)?
            } else {
                FileCluster::create(&path, &settings.username, &settings.password)?
            };

            let name = bucket
                .as_deref()
                .or(configured_bucket)
                .ok_or_else(|| anyhow!("no bucket given and none configured"))?;
            if !cluster.bucket_exists(name) {
                cluster.create_bucket(name)?;
            }

            if json {
                println!("{}", json!({ "success": true, "cluster": path.display().to_string(), "bucket": name }));
            } else {
                CliFormatter::success(&format!("Bucket '{}' ready", name));
                CliFormatter::kv("cluster", &path.display().to_string());
            }
            return Ok(());
        }
        DocAction::Query { query, single, bucket } => {
            let bucket = bucket.as_deref().or(configured_bucket);
            let client = connect_doc(settings, bucket)?;
            let rows = if single {
                vec![client.query_single(&query)?]
            } else {
                client.query_all(&query)?
            };
            if json || single {
                let out = if single { rows[0].clone() } else { Value::Array(rows) };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let count = rows.len();
                let records: Vec<_> = rows
                    .into_iter()
                    .filter_map(|row| match row {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .collect();
                CliFormatter::records(&records);
                CliFormatter::info(&format!("{} row(s)", count));
            }
            return Ok(());
        }
        _ => {}
    }

    let client = connect_doc(settings, configured_bucket)?;

    match action {
        DocAction::Get { id, envelope } => {
            let mode = if envelope { FetchMode::Envelope } else { FetchMode::Value };
            match client.get(&id, mode)? {
                DocumentFetchResult::Value(body) => {
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                DocumentFetchResult::Envelope { body, meta } => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&json!({ "value": body, "meta": meta }))?);
                    } else {
                        CliFormatter::kv("cas", &meta.cas.to_string());
                        CliFormatter::kv("created", &meta.created_at.to_rfc3339());
                        CliFormatter::kv("modified", &meta.modified_at.to_rfc3339());
                        println!("{}", serde_json::to_string_pretty(&body)?);
                    }
                }
            }
        }
        DocAction::Insert { id, json: body } => {
            report_mutation("Inserted", &client.insert(&id, &parse_body(&body)?)?, json)
        }
        DocAction::Update { id, json: body } => {
            report_mutation("Updated", &client.update(&id, &parse_body(&body)?)?, json)
        }
        DocAction::Upsert { id, json: body } => {
            report_mutation("Upserted", &client.upsert(&id, &parse_body(&body)?)?, json)
        }
        DocAction::Delete { id } => report_mutation("Deleted", &client.delete(&id)?, json),
        DocAction::Init { .. } | DocAction::Query { .. } => {}
    }

    Ok(())
}

fn connect_doc(settings: &DocumentStoreConfig, bucket: Option<&str>) -> anyhow::Result<DocumentStoreClient> {
    let client = DocumentStoreClient::connect(&settings.url, &settings.username, &settings.password, bucket)?;
    Ok(client)
}

fn parse_body(text: &str) -> anyhow::Result<DocumentBody> {
    match serde_json::from_str(text).context("document body is not valid JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("document body must be a JSON object"),
    }
}

fn report_mutation(verb: &str, result: &MutationResult, json: bool) {
    if json {
        println!("{}", json!({ "id": result.id, "cas": result.cas }));
    } else {
        CliFormatter::success(&format!("{} {} (cas {})", verb, result.id, result.cas));
    }
}
