//! Guide generation pipeline
//!
//! Question in, documented workflow out: parse the question, drive the
//! browser with the capture hook attached, then write `metadata.json` and
//! `workflow.md` for whatever was captured.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::navigator::{Navigator, RunSummary};
use crate::agent::task_parser::TaskParser;
use crate::capture::{BrowserHandle, StepDispatcher};
use crate::core::{Config, GuideError, ParsedQuery, ProgressEvent, ProgressSink, Result};
use crate::dataset::{DatasetWriter, DocsGenerator, UrlCache, WorkflowMetadata};
use crate::llm::{create_provider, LLMProvider};
use crate::tools::browser::BrowserExecutor;
use crate::tools::{ToolExecutor, ToolRegistry};

/// Result of one generated guide
#[derive(Debug, Clone)]
pub struct GuideOutcome {
    pub parsed: ParsedQuery,
    /// `<dataset_root>/<app>/<task_slug>`
    pub dataset_dir: PathBuf,
    /// Screenshot paths relative to `dataset_dir`, in step order
    pub screenshots: Vec<String>,
    pub workflow_file: PathBuf,
    /// Hook invocations, captured or not
    pub steps_observed: usize,
    pub turns: usize,
}

/// Owns the long-lived pieces of a guide run
pub struct GuideGenerator {
    config: Config,
    llm: Arc<dyn LLMProvider>,
    urls: Arc<UrlCache>,
}

impl GuideGenerator {
    /// Build the LLM provider described by the config
    pub fn new(config: Config) -> Result<Self> {
        let llm = create_provider(&config)?;
        Ok(Self::with_provider(config, llm))
    }

    pub fn with_provider(config: Config, llm: Arc<dyn LLMProvider>) -> Self {
        let urls = Arc::new(UrlCache::new(config.url_cache_path()));
        Self { config, llm, urls }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn LLMProvider> {
        &self.llm
    }

    /// Parse a question without running anything
    pub async fn parse(&self, question: &str) -> Result<ParsedQuery> {
        TaskParser::new(
            Arc::clone(&self.llm),
            self.config.models.parser.clone(),
            Arc::clone(&self.urls),
        )
        .parse(question)
        .await
    }

    /// Generate a guide with a fresh agent-browser session
    pub async fn generate(
        &self,
        question: &str,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<GuideOutcome> {
        progress.emit(ProgressEvent::status("parsing", "Processing your query..."));
        println!("🤔 Understanding your question...");
        let parsed = self.parse(question).await?;
        println!("✓ App detected: {}", parsed.app);
        println!("✓ Task detected: {}\n", parsed.task);

        if !BrowserExecutor::is_available().await {
            return Err(GuideError::AgentBrowserNotFound);
        }

        let browser = Arc::new(BrowserExecutor::from_config(&self.config.browser));
        let tools = Arc::new(ToolRegistry::new(Arc::clone(&browser)));

        let outcome = self
            .run(question, parsed, tools, browser.clone(), progress)
            .await;

        if browser.is_open() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "failed to close browser session");
            }
        }
        outcome
    }

    /// Navigate and capture with the given tools and browser, then write
    /// the dataset entry
    pub async fn run(
        &self,
        question: &str,
        parsed: ParsedQuery,
        tools: Arc<dyn ToolExecutor>,
        browser: Arc<dyn BrowserHandle>,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<GuideOutcome> {
        let task_name = parsed.task_slug();
        progress.emit(ProgressEvent::Status {
            message: format!("Starting task: {} on {}", task_name, parsed.app),
            stage: "navigating".to_string(),
            app_name: Some(parsed.app.clone()),
            task_name: Some(task_name.clone()),
        });

        let writer = DatasetWriter::create(&self.config.dataset.root, &parsed.app, &task_name)?;
        let mut dispatcher = StepDispatcher::new(
            browser,
            writer,
            self.config.capture.clone(),
            parsed.requires_auth,
            progress,
        );

        println!("{}", "=".repeat(70));
        println!("Generating guide: How to {} in {}", parsed.task, parsed.app);
        println!("{}\n", "=".repeat(70));

        let navigator = Navigator::new(
            Arc::clone(&self.llm),
            self.config.models.navigator.clone(),
            tools,
            self.config.agent.max_turns,
        )
        .with_debug(self.config.agent.debug);

        let summary: RunSummary = navigator.run(&parsed, &mut dispatcher).await?;

        let writer = dispatcher.writer().clone();
        let session = dispatcher.finish();
        let steps_observed = session.observed();
        let states = session.into_states();
        let screenshots: Vec<String> = states.iter().map(|s| s.screenshot.clone()).collect();

        println!("\n📁 Saving to dataset...");
        let metadata = WorkflowMetadata::new(&task_name, question, &parsed.app, states);
        writer.write_metadata(&metadata)?;
        let workflow_file = DocsGenerator::new(&self.config.dataset.root)
            .write_workflow(writer.task_dir(), &metadata)?;

        info!(
            app = %parsed.app,
            task = %task_name,
            screenshots = screenshots.len(),
            turns = summary.turns,
            "guide written"
        );

        Ok(GuideOutcome {
            dataset_dir: writer.task_dir().to_path_buf(),
            parsed,
            screenshots,
            workflow_file,
            steps_observed,
            turns: summary.turns,
        })
    }
}
