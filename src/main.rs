use clap::Parser;
use resume_etl::utils::{logger, validation::Validate};
use resume_etl::{
    document_from_path, ChatCompletionClient, CliConfig, EtlEngine, EtlError, LocalStorage,
    Orchestrator, ResultWriter, RunConfig,
};
use std::sync::atomic::Ordering;

fn fail(e: &EtlError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

fn load_config(cli: &CliConfig) -> resume_etl::Result<RunConfig> {
    cli.validate()?;

    let mut config = match &cli.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };
    config.apply_env();
    cli.apply_to(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() {
    // .env 不存在時忽略
    let _ = dotenvy::dotenv();

    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting resume-etl CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = load_config(&cli).unwrap_or_else(|e| fail(&e));
    let settings = config.orchestrator_settings().unwrap_or_else(|e| fail(&e));
    let formats = config.output_formats().unwrap_or_else(|e| fail(&e));

    // 缺少金鑰時在處理任何文件前結束
    let client = ChatCompletionClient::new(&config.model_config()).unwrap_or_else(|e| fail(&e));
    tracing::info!(
        "Model {} at {} (reference month {})",
        settings.model_id,
        client.url(),
        settings.prompt.reference_month
    );

    if cli.is_single_document() && !cli.files[0].exists() {
        fail(&EtlError::DocumentNotFound {
            name: cli.files[0].display().to_string(),
        });
    }

    let documents = cli.files.iter().map(document_from_path).collect();

    let orchestrator = Orchestrator::new(client, settings);
    let abort = orchestrator.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing documents already started");
            abort.store(true, Ordering::SeqCst);
        }
    });

    let storage = LocalStorage::new(config.output_path());
    let engine = EtlEngine::new(orchestrator, ResultWriter::new(storage.clone(), formats));

    let report = engine.run(documents).await.unwrap_or_else(|e| fail(&e));

    for row in &report.batch.rows {
        match &row.error {
            None => println!("✅ {}", row.file),
            Some(error) => println!("❌ {}: {}", row.file, error),
        }
    }
    for file in &report.written_files {
        println!("📁 Output saved to: {}", storage.full_path(file).display());
    }

    if cli.print_json {
        match serde_json::to_string_pretty(&report.batch.rows) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(&e.into()),
        }
    }

    println!(
        "Processed {} document(s) in {:.1}s: {} succeeded, {} failed",
        report.batch.rows.len(),
        report.elapsed.as_secs_f64(),
        report.batch.succeeded(),
        report.batch.failed()
    );

    if report.batch.all_failed() {
        std::process::exit(1);
    }
}
