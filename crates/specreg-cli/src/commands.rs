use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;

use specreg_server::{ServerConfig, SpecregServer};
use specreg_spec::{JsonSpecProcessor, SpecProcessor};
use specreg_types::{Language, SpecInfo};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Check(args) => cmd_check(args, cli.format),
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }

    tracing::debug!(?config, "resolved server configuration");
    let server = SpecregServer::new(config)?;
    println!(
        "{} specreg listening on {}",
        "✓".green().bold(),
        server.config().bind_addr.to_string().bold()
    );
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_check(args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let language: Language = args.language.parse()?;
    let info = check_file(&args.file, language)?;
    match format {
        OutputFormat::Json => {
            let out = json!({
                "version": info.version.as_str(),
                "model_count": info.model_count,
                "title": info.title,
                "description": info.description,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{} {} is a valid spec", "✓".green().bold(), args.file.display());
            println!("  Version: {}", info.version.as_str().yellow());
            println!("  Models: {}", info.model_count.to_string().bold());
            if let Some(title) = &info.title {
                println!("  Title: {title}");
            }
        }
    }
    Ok(())
}

fn check_file(path: &Path, language: Language) -> anyhow::Result<SpecInfo> {
    let body = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    JsonSpecProcessor::new()
        .process(&body, language)
        .with_context(|| format!("{} is not a valid spec", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn check_file_reports_version_and_models() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"info": {{"title": "Pets", "version": "7"}},
                "components": {{"schemas": {{"Pet": {{"x-tablename": "pet"}}}}}}}}"#
        )
        .unwrap();

        let info = check_file(file.path(), Language::Json).unwrap();
        assert_eq!(info.version.as_str(), "7");
        assert_eq!(info.model_count, 1);
        assert_eq!(info.title.as_deref(), Some("Pets"));
    }

    #[test]
    fn check_file_rejects_documents_without_models() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"components": {{"schemas": {{}}}}}}"#).unwrap();
        assert!(check_file(file.path(), Language::Json).is_err());
    }

    #[test]
    fn check_file_reports_missing_file() {
        let err = check_file(Path::new("/definitely/not/here.json"), Language::Json).unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}
