//! CLI commands
//!
//! One handler per subcommand. Each takes the fully resolved config.

use std::sync::Arc;

use crate::agent::{GuideGenerator, GuideOutcome};
use crate::core::{Config, LogProgress, Result};
use crate::dataset::{DatasetIndex, DocsGenerator};
use crate::server;

/// `guidegen ask "<question>"`
pub async fn ask(config: Config, question: &str, open: bool) -> Result<()> {
    println!("{}", "=".repeat(70));
    println!("guidegen - UI guide generator");
    println!("{}", "=".repeat(70));
    println!("\nQuestion: {}\n", question);

    let generator = GuideGenerator::new(config)?;
    let outcome = generator.generate(question, Arc::new(LogProgress)).await?;
    println!("{}", render_outcome(&outcome));

    if open {
        if let Err(e) = webbrowser::open(&outcome.workflow_file.display().to_string()) {
            eprintln!("⚠ Could not open {}: {}", outcome.workflow_file.display(), e);
        }
    }
    Ok(())
}

/// `guidegen serve`
pub async fn serve(config: Config, open: bool) -> Result<()> {
    let project_root = std::env::current_dir()?;
    if open {
        let url = format!("http://localhost:{}/", config.server.port);
        if webbrowser::open(&url).is_err() {
            eprintln!("⚠ Could not open a browser at {}", url);
        }
    }
    let generator = GuideGenerator::new(config)?;
    server::serve(generator, project_root).await
}

/// `guidegen docs`: rebuild every workflow.md, summary.json and README.md
pub fn docs(config: &Config) -> Result<()> {
    let root = &config.dataset.root;
    let index = DatasetIndex::new(root);

    let rendered = index.generate_all_docs()?;
    let (summary_path, summary) = index.save_summary()?;
    let readme = DocsGenerator::new(root).write_readme(&summary)?;

    println!("✓ Regenerated {} workflow guide(s)", rendered);
    println!(
        "✓ {} workflows, {} captured states across {} app(s)",
        summary.total_workflows,
        summary.total_states_captured,
        summary.apps.len()
    );
    println!("  Summary: {}", summary_path.display());
    println!("  README:  {}", readme.display());
    Ok(())
}

/// `guidegen config [--init]`
pub fn config(config: &Config, init: bool) -> Result<()> {
    if init {
        if Config::config_exists() {
            println!("Config already exists at {}", Config::config_file().display());
        } else {
            let path = config.save()?;
            println!("✓ Wrote {}", path.display());
        }
        return Ok(());
    }

    println!("{}", render_config(config));
    Ok(())
}

/// Closing summary printed after `ask`
pub fn render_outcome(outcome: &GuideOutcome) -> String {
    let dir = outcome.dataset_dir.display();
    let mut output = format!(
        "\n{bar}\n✓ GUIDE GENERATED SUCCESSFULLY!\n{bar}\n\n\
         Task: {task}\n\
         App: {app}\n\n\
         Location: {dir}/\n\
         Screenshots: {dir}/screenshots/ ({count})\n\
         Guide: {guide}\n\
         Metadata: {dir}/metadata.json\n\n\
         Agent turns: {turns}\n\
         Steps observed: {steps}\n",
        bar = "=".repeat(70),
        task = outcome.parsed.task,
        app = outcome.parsed.app,
        dir = dir,
        count = outcome.screenshots.len(),
        guide = outcome.workflow_file.display(),
        turns = outcome.turns,
        steps = outcome.steps_observed,
    );
    if outcome.screenshots.is_empty() {
        output.push_str("\n⚠ No significant screens were captured.\n");
    }
    output.push_str(&"=".repeat(70));
    output
}

/// Human-readable view of the active configuration
pub fn render_config(config: &Config) -> String {
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    let file = if Config::config_exists() {
        Config::config_file().display().to_string()
    } else {
        "(defaults, no config file)".to_string()
    };

    format!(
        "guidegen Configuration:\n\
         ─────────────────────────────\n\
         Config file:  {}\n\
         Provider:     {}\n\
         Credentials:  {}\n\
         Parser:       {}\n\
         Navigator:    {}\n\
         Browser:      session {} ({})\n\
         Max turns:    {}\n\
         Dataset:      {}/\n\
         Server:       {}\n\
         Debug:        {}",
        file,
        config.llm.provider,
        if config.llm_key_configured() { "configured" } else { "missing" },
        config.models.parser,
        config.models.navigator,
        config.browser.session_name,
        if config.browser.headed { "headed" } else { "headless" },
        config.agent.max_turns,
        config.dataset.root.display(),
        config.server_addr(),
        on_off(config.agent.debug),
    )
}
