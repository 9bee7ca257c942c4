use clap::Parser;
use doc_tagger::api::{self, AppState};
use doc_tagger::domain::ports::{ConfigProvider, KeywordTagger};
use doc_tagger::utils::error::{DocError, ErrorSeverity};
use doc_tagger::utils::logger;
use doc_tagger::utils::monitor::SystemMonitor;
use doc_tagger::{CliConfig, Settings};
use std::sync::Arc;

fn exit_code(e: &DocError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(stage: &str, e: DocError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(&e));
}

#[cfg(feature = "local-model")]
async fn load_tagger(settings: &Settings) -> doc_tagger::Result<Option<Arc<dyn KeywordTagger>>> {
    use doc_tagger::{KeywordExtractor, MiniLmEmbedder};

    let model_id = settings.keywords.model_id.clone();
    let config = settings.keywords.config.clone();
    // 模型下載與載入是阻塞操作
    let extractor = tokio::task::spawn_blocking(move || {
        let embedder = MiniLmEmbedder::load(&model_id)?;
        KeywordExtractor::new(embedder, config)
    })
    .await
    .map_err(|e| DocError::EmbeddingError {
        message: format!("model loading task failed: {}", e),
    })??;

    let tagger: Arc<dyn KeywordTagger> = Arc::new(extractor);
    Ok(Some(tagger))
}

#[cfg(not(feature = "local-model"))]
async fn load_tagger(_settings: &Settings) -> doc_tagger::Result<Option<Arc<dyn KeywordTagger>>> {
    tracing::warn!("⚠️ Keyword tagging requested but this build lacks the `local-model` feature");
    Ok(None)
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();
    let resolved = cli.resolve();

    // 初始化日誌
    let (verbose, json_logs) = match &resolved {
        Ok(settings) => (settings.verbose, settings.json_logs),
        Err(_) => (cli.verbose, cli.json_logs),
    };
    if json_logs {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    let settings = match resolved {
        Ok(settings) => settings,
        Err(e) => fail("Configuration", e),
    };
    tracing::info!("🚀 Starting doc-tagger");
    tracing::debug!("Settings: {:?}", settings);

    let monitor = SystemMonitor::new(settings.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let tagger = if settings.keywords_enabled() {
        match load_tagger(&settings).await {
            Ok(tagger) => tagger,
            Err(e) => fail("Keyword model loading", e),
        }
    } else {
        None
    };

    let state = match AppState::build(&settings, tagger, monitor).await {
        Ok(state) => state,
        Err(e) => fail("Startup", e),
    };
    let service = state.service.clone();
    let app = api::router(state, &settings);

    let listener = match tokio::net::TcpListener::bind(settings.bind_address()).await {
        Ok(listener) => listener,
        Err(e) => fail("Binding", e.into()),
    };
    tracing::info!("📁 Writing text files to {}", settings.output_path());
    tracing::info!("🌐 Listening on http://{}", settings.bind_address());

    if let Err(e) = api::serve(listener, app).await {
        fail("Server", e);
    }

    service.monitor().log_final_stats();
    tracing::info!("✅ Server stopped");
}
