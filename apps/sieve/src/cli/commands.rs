//! # CLI Command Implementations

use crate::config::AppConfig;
use crate::executor;
use sieve_core::metrics::{Local, Metrics, Noop};
use sieve_core::{Processor, Resources, SieveError, condition, processor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader, BufWriter};
use tracing::Span;

/// Validate output path: the parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, SieveError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        SieveError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(SieveError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| SieveError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Build the shared resources and the configured processor.
pub fn build_processor(
    conf: &AppConfig,
    log: &Span,
    stats: Arc<dyn Metrics>,
) -> Result<Arc<dyn Processor>, SieveError> {
    let resources = Resources::from_config(&conf.resources, log, Arc::clone(&stats))?;
    processor::new(&conf.processor, &resources, log, stats)
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Filter batches from `input` (or stdin) into `output` (or stdout).
pub async fn cmd_run(
    config: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
    workers: usize,
    print_metrics: bool,
) -> Result<(), SieveError> {
    let conf = AppConfig::from_file(config)?;
    let stats = Arc::new(Local::new());
    let log = tracing::info_span!("sieve");
    let proc = build_processor(&conf, &log, stats.clone())?;

    tracing::info!(
        processor = %conf.processor.kind,
        workers,
        "Loaded config from {:?}",
        config
    );

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(path) => {
            let validated = crate::config::validate_input_path(path)?;
            let file = tokio::fs::File::open(&validated)
                .await
                .map_err(|e| SieveError::Io(format!("Open input: {}", e)))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut writer: Box<dyn AsyncWrite + Unpin + Send> = match output {
        Some(path) => {
            let validated = validate_output_path(path)?;
            let file = tokio::fs::File::create(&validated)
                .await
                .map_err(|e| SieveError::Io(format!("Create output: {}", e)))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(tokio::io::stdout())),
    };

    let summary = executor::run(proc, reader, &mut writer, workers).await?;

    tracing::info!(
        batches_in = summary.batches_in,
        batches_out = summary.batches_out,
        acked = summary.acked,
        errors = summary.errors,
        "Run complete"
    );

    if print_metrics {
        let output = serde_json::json!({
            "summary": summary,
            "counters": stats.snapshot(),
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    }

    Ok(())
}

// =============================================================================
// LINT COMMAND
// =============================================================================

/// Build the configured processor and report the outcome.
pub fn cmd_lint(config: &Path, json_mode: bool) -> Result<(), SieveError> {
    let conf = AppConfig::from_file(config)?;
    build_processor(&conf, &Span::none(), Arc::new(Noop))?;

    if json_mode {
        let output = serde_json::json!({
            "valid": true,
            "processor": conf.processor.kind,
            "condition": conf.processor.filter_parts.condition.kind,
            "resources": conf.resources.conditions.keys().collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Config OK: {:?}", config);
    println!("  Processor: {}", conf.processor.kind);
    println!("  Condition: {}", conf.processor.filter_parts.condition.kind);
    println!("  Resources: {}", conf.resources.conditions.len());

    Ok(())
}

// =============================================================================
// SANITIZE COMMAND
// =============================================================================

/// Print the sanitized processor and resource configs as JSON.
pub fn cmd_sanitize(config: &Path) -> Result<(), SieveError> {
    let conf = AppConfig::from_file(config)?;
    let output = sanitized(&conf)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&output).unwrap_or_default()
    );
    Ok(())
}

/// Sanitized form of a whole config file.
pub fn sanitized(conf: &AppConfig) -> Result<serde_json::Value, SieveError> {
    let mut conditions = serde_json::Map::new();
    for (name, cond) in &conf.resources.conditions {
        conditions.insert(name.clone(), condition::sanitize(cond)?);
    }

    let mut output = serde_json::Map::new();
    output.insert("processor".to_string(), processor::sanitize(&conf.processor)?);
    if !conditions.is_empty() {
        output.insert(
            "resources".to_string(),
            serde_json::json!({ "conditions": conditions }),
        );
    }
    Ok(serde_json::Value::Object(output))
}

// =============================================================================
// LIST COMMAND
// =============================================================================

/// List registered types with their descriptions.
pub fn cmd_list(json_mode: bool) -> Result<(), SieveError> {
    let processors = processor::constructors();
    let conditions = condition::constructors();

    if json_mode {
        let output = serde_json::json!({
            "processors": processors
                .iter()
                .map(|(name, spec)| (name.to_string(), spec.description.into()))
                .collect::<serde_json::Map<String, serde_json::Value>>(),
            "conditions": conditions
                .iter()
                .map(|(name, spec)| (name.to_string(), spec.description.into()))
                .collect::<serde_json::Map<String, serde_json::Value>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Processors");
    println!("==========");
    for (name, spec) in processors {
        println!("{}", name);
        println!("    {}", spec.description);
    }
    println!();
    println!("Conditions");
    println!("==========");
    for (name, spec) in conditions {
        println!("{}", name);
        println!("    {}", spec.description);
    }

    Ok(())
}
