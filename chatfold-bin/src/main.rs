use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, mpsc};

use chatfold_core::{
    aggregator::ResponseAggregator,
    catalog::{ModelFamily, StandardModel},
    config::Config,
    model::{AggregateMessage, ChatChunk, ChatMessage, ChatRequest},
    provider::{ChatStreamSource, ScriptedSource},
    provider_factory::ProviderRegistry,
    router::ModelResolver,
    stream::ChunkStream,
    telemetry::{self, AggregationLog, TelemetrySink},
};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "chatfold: streamed chat response aggregation", long_about = None)]
struct Cli {
    /// Config file (JSON or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded chunk array through the aggregator (prints deltas live)
    Replay {
        #[arg(long, help = "JSON file holding an array of chunks")]
        file: PathBuf,
        #[arg(long, default_value = "recorded")]
        model: String,
    },
    /// List the standard model catalog
    Models {
        #[arg(long)]
        family: Option<ModelFamily>,
    },
    /// Show which family and client parameters a model resolves to
    Resolve {
        #[arg(long)]
        model: String,
    },
}

/// Forwards aggregation records to the log.
struct LogSink;

impl TelemetrySink for LogSink {
    fn record_aggregation(&self, log: AggregationLog) {
        tracing::info!(
            target: "chatfold.telemetry",
            outcome = log.outcome.as_deref().unwrap_or("unknown"),
            model = log.model.as_deref().unwrap_or(""),
            chunks = log.chunks,
            tokens.total = log.tokens_total.unwrap_or(0),
            error = log.error_message.as_deref().unwrap_or(""),
            "aggregation finished"
        );
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    Ok(match path {
        Some(p) => Config::from_path(p)?,
        None => Config::default(),
    })
}

/// Write deltas to `out` as they arrive. A stream error ends the replay with that error.
async fn print_stream<W: Write>(
    aggregator: &ResponseAggregator,
    upstream: ChunkStream,
    out: &mut W,
) -> anyhow::Result<Option<AggregateMessage>> {
    let (tx, rx) = mpsc::channel();
    let mut tap = aggregator.aggregate(upstream, move |aggregate| {
        let _ = tx.send(aggregate);
    });
    while let Some(item) = tap.next().await {
        match item {
            Ok(chunk) => {
                if let Some(txt) = chunk.as_text_delta() {
                    write!(out, "{}", txt)?;
                    out.flush().ok();
                }
            }
            Err(err) => {
                writeln!(out)?;
                return Err(err.into());
            }
        }
    }
    drop(tap);
    let aggregate = rx.try_recv().ok();
    if aggregate.is_some() {
        writeln!(out)?;
    }
    Ok(aggregate)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    telemetry::set_telemetry_sink(Arc::new(LogSink));

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Replay { file, model } => {
            let raw = std::fs::read_to_string(&file)?;
            let chunks: Vec<ChatChunk> = serde_json::from_str(&raw)?;
            let family = ModelResolver::new(&cfg)?.resolve(&model);
            tracing::debug!(%model, %family, chunks = chunks.len(), "replaying recording");

            let source = ScriptedSource::new(family.key(), chunks);
            let req = ChatRequest {
                model,
                messages: vec![ChatMessage::user("replay")],
                options: Default::default(),
            };
            let upstream = source.stream(req).await?;

            let aggregator = ResponseAggregator::from_config(&cfg.aggregation);
            let aggregate = print_stream(&aggregator, upstream, &mut io::stdout()).await?;
            if let Some(aggregate) = aggregate {
                let usage = aggregate.metadata.usage.clone().unwrap_or_default();
                eprintln!(
                    "[id: {}] [model: {}] [tokens: prompt={} completion={} total={}]",
                    aggregate.metadata.id,
                    aggregate.metadata.model,
                    usage.prompt_tokens.unwrap_or(0),
                    usage.completion_tokens.unwrap_or(0),
                    usage.total_tokens(),
                );
            }
        }
        Commands::Models { family } => {
            for m in StandardModel::all()
                .iter()
                .filter(|m| family.is_none_or(|f| m.family == f))
            {
                println!(
                    "{:<28} {:<14} {:>9} streaming={}",
                    m.id, m.family, m.input_token_limit, m.supports_streaming
                );
            }
        }
        Commands::Resolve { model } => {
            let family = ModelResolver::new(&cfg)?.resolve(&model);
            let params = ProviderRegistry::standard().client_params(
                family,
                &cfg.settings_for(family),
                &model,
            )?;
            println!("family:     {}", params.family);
            println!("model:      {}", params.model);
            println!("base_url:   {}", params.base_url);
            println!(
                "api_key:    {}",
                if params.has_api_key() { "<redacted>" } else { "<none>" }
            );
            if let Some(d) = &params.deployment {
                println!("deployment: {}", d);
            }
            println!(
                "options:    temperature={:?} top_p={:?}",
                params.options.temperature, params.options.top_p
            );
        }
    }

    Ok(())
}
