use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use webpilot::queue::LoggingListener;
use webpilot::{
    Action, Broker, BrowserDriver, BrowserPool, Config, ExecutionStore, FileStore, Job,
    JobPayload, NewExecution, OllamaPlanner, Pacing, PlaywrightDriver, RedisBroker,
    ScriptPlanner, Worker, WorkerOptions,
};

#[derive(Parser)]
#[command(name = "webpilot-worker")]
#[command(about = "Run browser automation jobs from the queue", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the worker processing loop
    Run,

    /// Create an execution and enqueue a job for it
    Submit {
        /// Natural-language prompt to plan into a script
        #[arg(short, long, conflicts_with = "script")]
        prompt: Option<String>,

        /// Path to a JSON action script to run as-is
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Workflow id to associate with the execution
        #[arg(short, long)]
        workflow: Option<String>,
    },

    /// Print aggregate queue counts
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env();

    match cli.command {
        Commands::Run => run_worker(config).await,
        Commands::Submit {
            prompt,
            script,
            workflow,
        } => submit(config, prompt, script, workflow).await,
        Commands::Stats => stats(config).await,
    }
}

async fn run_worker(config: Config) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .context("creating upload directory")?;

    let driver: Arc<dyn BrowserDriver> = Arc::new(
        PlaywrightDriver::start()
            .await
            .context("starting Playwright sidecar")?,
    );
    let pool = Arc::new(BrowserPool::new(
        driver.clone(),
        config.max_browsers,
        config.headless,
        config.viewport(),
    ));
    let store = Arc::new(FileStore::open(&config.data_dir).await?);
    let broker = Arc::new(
        RedisBroker::connect(&config.redis_url)
            .await
            .context("connecting to Redis")?,
    );

    let mut worker = Worker::new(
        driver,
        pool.clone(),
        broker,
        store,
        WorkerOptions {
            headless: config.headless,
            viewport: config.viewport(),
            upload_dir: config.upload_dir.clone(),
            concurrency: config.worker_concurrency,
            pacing: Pacing::human(),
            ..WorkerOptions::default()
        },
    );
    worker.register_listener(Arc::new(LoggingListener));

    let worker = Arc::new(worker);
    let run = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.run().await })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, cleaning up");
    run.abort();
    pool.shutdown().await;
    Ok(())
}

async fn submit(
    config: Config,
    prompt: Option<String>,
    script: Option<PathBuf>,
    workflow: Option<String>,
) -> anyhow::Result<()> {
    let prompt = prompt.unwrap_or_default();

    let steps: Vec<Action> = match script {
        Some(path) => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let steps = serde_json::from_str(&raw).context("parsing action script")?;
            webpilot::ensure_trailing_screenshot(steps)
        }
        None => {
            anyhow::ensure!(!prompt.is_empty(), "either --prompt or --script is required");
            let planner = OllamaPlanner::new(&config.ollama_url, &config.ollama_model);
            planner.plan(&prompt).await
        }
    };

    let store = FileStore::open(&config.data_dir).await?;
    let execution = store
        .create_execution(NewExecution {
            prompt: prompt.clone(),
            workflow_id: workflow,
            steps: steps.clone(),
        })
        .await?;

    let broker = RedisBroker::connect(&config.redis_url).await?;
    let job = Job::new(JobPayload {
        execution_id: execution.id.clone(),
        steps,
        prompt,
    });
    broker.enqueue(&job).await?;

    println!("execution {} queued as job {}", execution.id, job.id);
    Ok(())
}

async fn stats(config: Config) -> anyhow::Result<()> {
    let broker = RedisBroker::connect(&config.redis_url).await?;
    let counts = broker.counts().await?;
    println!("waiting:   {}", counts.waiting);
    println!("active:    {}", counts.active);
    println!("delayed:   {}", counts.delayed);
    println!("completed: {}", counts.completed);
    println!("failed:    {}", counts.failed);
    println!("total:     {}", counts.total());
    Ok(())
}
