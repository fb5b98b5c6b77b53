use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use action_strategies::{ResolveContext, StrategyDeps, StrategyOrchestrator};
use agent_loop::{AdaptiveLoopController, AdaptiveRunResult, ScheduledCapture, ScreenshotSchedule};
use anyhow::{anyhow, Context, Result};
use cdp_driver::ChromeSession;
use chrono::Utc;
use clap::Args;
use gamecheck_core_types::{Outcome, RunId, NO_STRATEGY};
use tracing::{info, warn};
use url::Url;
use vision_llm::VisionLlmClient;

use super::args::{BudgetOverrides, OutputFormat};
use super::context::CliContext;
use crate::artifacts::FileArtifactStore;
use crate::config::Config;
use crate::report::{RunMode, RunReport};
use crate::scoring::{score_run, score_schedule, PlayabilityScore};

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// URL of the game under test
    pub url: String,

    /// What the adaptive loop should try to achieve
    #[arg(long)]
    pub goal: Option<String>,

    #[command(flatten)]
    pub limits: BudgetOverrides,

    /// Maximum number of actions in the adaptive loop
    #[arg(long)]
    pub max_actions: Option<u32>,

    /// Directory for report.json and screenshots
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Skip the reasoning service and capture on a fixed schedule
    #[arg(long)]
    pub no_vision: bool,

    /// Run the browser without a window
    #[arg(long, conflicts_with = "headed")]
    pub headless: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,
}

impl RunArgs {
    /// Effective config for this run: file and environment first, flags last.
    pub fn resolve_config(&self, base: &Config) -> Result<Config> {
        let mut config = base.clone();
        self.limits.apply(&mut config.adaptive);
        if let Some(max_actions) = self.max_actions {
            config.adaptive.max_actions = max_actions;
        }
        if let Some(goal) = &self.goal {
            config.adaptive.goal = goal.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.no_vision {
            config.reasoning.enabled = false;
        }
        if self.headless {
            config.browser.headless = true;
        } else if self.headed {
            config.browser.headless = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// What a check produced, before it is written out.
pub struct CheckResult {
    pub mode: RunMode,
    pub bootstrap: Outcome,
    pub score: PlayabilityScore,
    pub adaptive: Option<AdaptiveRunResult>,
    pub schedule: Option<Vec<ScheduledCapture>>,
}

pub async fn cmd_run(args: RunArgs, ctx: &CliContext) -> Result<()> {
    let config = args.resolve_config(ctx.config())?;
    let url = Url::parse(&args.url).with_context(|| format!("invalid URL '{}'", args.url))?;
    let started_at = Utc::now();

    let run_dir = config.output_dir.join(format!(
        "{}-{}",
        started_at.format("%Y%m%d-%H%M%S"),
        &RunId::new().0[..8]
    ));
    let artifacts = Arc::new(
        FileArtifactStore::new(run_dir.join("screenshots")).context("preparing output directory")?,
    );

    let session = ChromeSession::launch(&config.browser)
        .await
        .context("launching browser")?;
    let checked = check_url(&session, &url, &config, artifacts.clone()).await;
    session.close().await;
    let checked = checked?;

    let mut report = RunReport::new(
        url.as_str(),
        config.adaptive.goal.clone(),
        checked.mode,
        started_at,
        checked.score.clone(),
        checked.bootstrap,
    )
    .with_artifacts(artifacts.entries());
    if let Some(result) = checked.adaptive {
        report = report.with_adaptive(result);
    }
    if let Some(captures) = checked.schedule {
        report = report.with_schedule(captures);
    }
    let report_path = report.write_to(&run_dir).await?;
    info!(path = %report_path.display(), score = report.score.score, "Report written");

    match ctx.output() {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Human => print_summary(&report, &report_path),
    }
    Ok(())
}

async fn check_url(
    session: &ChromeSession,
    url: &Url,
    config: &Config,
    artifacts: Arc<FileArtifactStore>,
) -> Result<CheckResult> {
    session
        .navigate(url.as_str(), Duration::from_millis(config.navigation_timeout_ms))
        .await
        .context("loading game")?;

    let mut deps = StrategyDeps::new(session.driver()).with_artifacts(artifacts);
    if config.reasoning_active() {
        let client = VisionLlmClient::new(config.reasoning.client.clone())?;
        deps = deps.with_reasoning(Arc::new(client));
    } else if config.reasoning.enabled {
        warn!("Reasoning enabled but no API key configured; using fixed schedule");
    }

    check_game(config, deps).await
}

/// Activate the start control, then run the adaptive loop when reasoning is
/// available or the fixed capture schedule otherwise.
pub async fn check_game(config: &Config, deps: StrategyDeps) -> Result<CheckResult> {
    let orchestrator = StrategyOrchestrator::start_control(deps.clone(), &config.strategies);
    info!(strategies = ?orchestrator.strategies(), "Start-control strategies ready");
    let start = ResolveContext::new(config.strategies.goal.clone());

    if deps.reasoning.is_some() {
        let controller = AdaptiveLoopController::new(config.adaptive.clone(), deps)?;
        let result = controller.run(&orchestrator, &start).await;
        return Ok(CheckResult {
            mode: RunMode::Adaptive,
            bootstrap: result.bootstrap.clone(),
            score: score_run(&result),
            adaptive: Some(result),
            schedule: None,
        });
    }

    let started = Instant::now();
    let bootstrap = match orchestrator.resolve(&start).await {
        Ok(outcome) => outcome,
        Err(err) => return Err(anyhow!(err).context("start-control resolution aborted")),
    };
    let captures = if bootstrap.success {
        ScreenshotSchedule::for_config(&config.adaptive)
            .capture(&deps)
            .await
    } else {
        warn!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Start control not activated; skipping scheduled captures"
        );
        Vec::new()
    };

    Ok(CheckResult {
        mode: RunMode::FixedSchedule,
        score: score_schedule(&bootstrap, &captures),
        bootstrap,
        adaptive: None,
        schedule: Some(captures),
    })
}

fn print_summary(report: &RunReport, path: &std::path::Path) {
    let score = &report.score;
    println!("Game: {}", report.url);
    println!(
        "Start control: {}",
        if report.bootstrap.success {
            format!("activated via {}", report.bootstrap.strategy_name)
        } else if report.bootstrap.strategy_name == NO_STRATEGY {
            "not found".to_string()
        } else {
            format!("failed ({})", report.bootstrap.strategy_name)
        }
    );
    if let Some(result) = &report.adaptive {
        println!(
            "Cycles: {} ({} failed), stopped: {:?}, estimated spend ${:.2}",
            result.cycles.len(),
            result.failed_cycles(),
            result.termination,
            result.budget.spent_estimate_usd
        );
    }
    if let Some(captures) = &report.schedule {
        println!("Scheduled screenshots: {}", captures.len());
    }
    println!(
        "Playability score: {}/100 (start {}, cycles {}, completion {})",
        score.score, score.start_points, score.cycle_points, score.completion_points
    );
    for issue in &score.issues {
        println!("  - {}", issue);
    }
    println!("Report: {}", path.display());
}
