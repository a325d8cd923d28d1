use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::info;

use app::{AppConfig, BuildPipeline, QueryEngine, save_answer};
use ingest::{Document, FileReader};
use services::{OllamaCompletion, OllamaEmbedding};

const USAGE: &str = "Usage: kgrag <path>... --query \"<question>\" [--out <file>] [--graph-out <file>]

Paths may be .txt/.md files or directories of them.
Environment: KGRAG_BASE_URL, KGRAG_MODEL, KGRAG_EMBED_MODEL override the
default model backend settings.";

struct CliArgs {
    paths: Vec<PathBuf>,
    query: String,
    out: PathBuf,
    graph_out: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliArgs> {
    let mut paths = Vec::new();
    let mut query = None;
    let mut out = PathBuf::from("response.md");
    let mut graph_out = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--query" => query = Some(iter.next().context("--query needs a value")?),
            "--out" => out = PathBuf::from(iter.next().context("--out needs a value")?),
            "--graph-out" => {
                graph_out = Some(PathBuf::from(
                    iter.next().context("--graph-out needs a value")?,
                ))
            }
            "--help" | "-h" => bail!("{}", USAGE),
            _ => paths.push(PathBuf::from(arg)),
        }
    }

    let Some(query) = query else {
        bail!("{}", USAGE);
    };
    if paths.is_empty() {
        bail!("{}", USAGE);
    }

    Ok(CliArgs {
        paths,
        query,
        out,
        graph_out,
    })
}

fn config_from_env() -> AppConfig {
    let mut config = AppConfig::default();
    if let Ok(url) = std::env::var("KGRAG_BASE_URL") {
        config.service.base_url = url;
    }
    if let Ok(model) = std::env::var("KGRAG_MODEL") {
        config.service.completion_model = model;
    }
    if let Ok(model) = std::env::var("KGRAG_EMBED_MODEL") {
        config.service.embedding_model = model;
    }
    config
}

async fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            documents.extend(FileReader::read_directory(path).await?);
        } else {
            files.push(path.clone());
        }
    }
    documents.extend(FileReader::read_paths(&files).await);

    if documents.is_empty() {
        bail!("No readable documents found");
    }
    Ok(documents)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = parse_args(std::env::args().skip(1).collect())?;
    let config = config_from_env();

    let completion = Arc::new(OllamaCompletion::new(&config.service)?);
    let embedder = Arc::new(OllamaEmbedding::new(&config.service)?);

    let documents = load_documents(&args.paths).await?;

    let pipeline = BuildPipeline::new(completion.clone(), embedder.clone(), config.clone());
    let (knowledge, report) = pipeline.build(&documents).await?;
    info!(
        documents = report.documents,
        chunks = report.chunks,
        triplets = report.triplets,
        chunks_without_triplets = report.chunks_without_triplets,
        embedding_failures = report.embedding_failures,
        "Build finished"
    );

    if let Some(graph_out) = &args.graph_out {
        let snapshot = knowledge.graph.snapshot();
        let json = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize graph snapshot")?;
        tokio::fs::write(graph_out, json)
            .await
            .context(format!("Failed to write graph snapshot to {:?}", graph_out))?;
        info!(path = %graph_out.display(), "Graph snapshot written");
    }

    let engine = QueryEngine::new(&knowledge, embedder, completion, &config);
    let answer = engine.answer(&args.query).await?;

    save_answer(&answer, &args.out).await?;
    info!(path = %args.out.display(), "Answer written");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_full() {
        let args = parse_args(strings(&[
            "docs/",
            "notes.md",
            "--query",
            "what is x",
            "--out",
            "answer.md",
            "--graph-out",
            "graph.json",
        ]))
        .unwrap();

        assert_eq!(args.paths.len(), 2);
        assert_eq!(args.query, "what is x");
        assert_eq!(args.out, PathBuf::from("answer.md"));
        assert_eq!(args.graph_out, Some(PathBuf::from("graph.json")));
    }

    #[test]
    fn test_parse_args_requires_query_and_paths() {
        assert!(parse_args(strings(&["docs/"])).is_err());
        assert!(parse_args(strings(&["--query", "q"])).is_err());
    }

    #[test]
    fn test_parse_args_defaults_out() {
        let args = parse_args(strings(&["docs/", "--query", "q"])).unwrap();
        assert_eq!(args.out, PathBuf::from("response.md"));
        assert!(args.graph_out.is_none());
    }
}
