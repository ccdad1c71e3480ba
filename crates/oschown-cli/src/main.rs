//! oschown - change the owner of cloud resources
//!
//! Usage:
//!   oschown --root-resource nova --root-id <uuid> --target-user U --target-project P
//!   oschown --all-resources-for-project P --target-user U --target-project P2
//!   oschown ... --dry-run      # resolve only, change nothing

mod prompt;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};
use console::style;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oschown_core::context::AppContext;
use oschown_core::engine::ChownStatus;
use oschown_core::identity::{IdentityDirectory, resolve_context};
use oschown_core::provider::ProviderRegistry;
use oschown_core::types::ChownContext;
use oschown_core::workflow::{OwnerWorkflow, Workflow, WorkflowRegistry, WorkflowReport};

#[derive(Parser)]
#[command(name = "oschown")]
#[command(about = "Change the owning user and project of cloud resources", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Do not actually chown resources
    #[arg(long)]
    dry_run: bool,

    /// Resource type of the root resource
    #[arg(long, value_name = "RESOURCE", requires = "root_id")]
    root_resource: Option<String>,

    /// Id of the root resource
    #[arg(long, value_name = "ID", requires = "root_resource")]
    root_id: Option<String>,

    /// Move all resources in this project
    #[arg(long, value_name = "PROJECT", conflicts_with = "root_resource")]
    all_resources_for_project: Option<String>,

    /// Change ownership of resources to this project
    #[arg(long, value_name = "PROJECT")]
    target_project: String,

    /// Change ownership of resources to this user
    #[arg(long, value_name = "USER")]
    target_user: String,

    /// Do not validate/normalize target user and project
    #[arg(long)]
    no_validate: bool,

    /// Path to oschown.toml (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Output format
    #[arg(short = 'o', long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

/// What a run starts from.
enum Target<'w> {
    Root { workflow: &'w dyn Workflow, id: String },
    Project(String),
}

fn main() -> Result<()> {
    let workflows = WorkflowRegistry::default();
    let matches = command(&workflows).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let default_filter = if cli.verbose {
        "oschown=info"
    } else {
        "oschown=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let exit_code = run(cli, &workflows)?;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

/// The CLI with the registered root kinds spelled out in the help.
fn command(workflows: &WorkflowRegistry) -> clap::Command {
    Cli::command().mut_arg("root_resource", |arg| {
        arg.help(format!(
            "Resource type of the root resource ({})",
            workflows.kinds().join(", ")
        ))
    })
}

fn run(cli: Cli, workflows: &WorkflowRegistry) -> Result<i32> {
    let app = match &cli.config {
        Some(path) => AppContext::from_config_path(path)?,
        None => AppContext::with_defaults()?,
    };
    info!("Using config {}", app.config_path().display());
    info!("Using state directory {}", app.state_dir().display());

    let target = match (&cli.root_resource, &cli.root_id, &cli.all_resources_for_project) {
        (Some(kind), Some(id), _) => match workflows.get(kind) {
            Some(workflow) => Target::Root {
                workflow,
                id: id.clone(),
            },
            None => {
                println!("No workflow for {}", kind);
                println!("{}", available_workflows(workflows));
                return Ok(1);
            }
        },
        (_, _, Some(project)) => Target::Project(project.clone()),
        _ => {
            println!("Use either --root-resource and --root-id or --all-resources-for-project");
            return Ok(1);
        }
    };

    let directory = app.identity_directory();
    let directory: Option<&dyn IdentityDirectory> = if cli.no_validate {
        None
    } else {
        Some(&directory)
    };
    let ctx = resolve_context(directory, &cli.target_user, &cli.target_project, cli.dry_run)?;
    let target = match (target, directory) {
        (Target::Project(project), Some(directory)) => {
            Target::Project(directory.resolve_project(&project)?)
        }
        (target, _) => target,
    };

    let providers = app.provider_registry();
    let execute = |ctx: &ChownContext| match &target {
        Target::Root { workflow, id } => workflow.run(&providers, ctx, id),
        Target::Project(project) => OwnerWorkflow.run(&providers, ctx, None, project),
    };

    if !cli.dry_run && !cli.yes {
        let preview = ChownContext::new(ctx.target_user_id(), ctx.target_project_id(), true);
        let plan = execute(&preview);
        if !plan.is_success() {
            print_report(&plan, cli.format, &providers)?;
            return Ok(1);
        }
        if !prompt::confirm_plan(&plan, &ctx)? {
            println!("Aborted, nothing was changed.");
            return Ok(0);
        }
    }

    let report = execute(&ctx);
    print_report(&report, cli.format, &providers)?;

    Ok(if report.is_success() { 0 } else { 1 })
}

fn available_workflows(workflows: &WorkflowRegistry) -> String {
    let mut out = String::from("Available workflows:");
    for workflow in workflows.all() {
        out.push_str(&format!("\n  {:<10} {}", workflow.kind(), workflow.description()));
    }
    out
}

fn print_report(
    report: &WorkflowReport,
    format: OutputFormat,
    providers: &ProviderRegistry,
) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(report, providers),
        OutputFormat::Json => print_json(report)?,
    }
    Ok(())
}

fn print_table(report: &WorkflowReport, providers: &ProviderRegistry) {
    match &report.root {
        Some(root) => println!("Workflow: {} (root {})", report.workflow, root),
        None => println!("Workflow: {}", report.workflow),
    }
    println!("Providers: {}", providers.names().join(", "));
    if report.dry_run {
        println!("{}", style("Dry run: no changes will be made").yellow());
    }
    println!();

    if !report.mutations.outcomes.is_empty() {
        println!("  {:<50} Status", "Resource");
        println!("  {}", "-".repeat(64));
        for outcome in &report.mutations.outcomes {
            println!(
                "  {:<50} {}",
                outcome.id.to_string(),
                status_label(&outcome.status)
            );
        }
        println!();
    }

    if !report.unresolved.is_empty() {
        println!("Unresolved ({}):", report.unresolved.len());
        for id in &report.unresolved {
            println!("  {}", id);
        }
        println!();
    }

    match &report.error {
        Some(e) if report.failed_resolution() => {
            println!("{} {}", style("Resolution failed:").red().bold(), e);
            println!("No resources were changed.");
        }
        Some(e) => println!("{} {}", style("Chown failed:").red().bold(), e),
        None if report.dry_run => {
            println!("Summary: {} resources would change", report.resolved.len())
        }
        None => println!(
            "Summary: {} resources changed",
            report.mutations.changed().len()
        ),
    }
}

fn status_label(status: &ChownStatus) -> String {
    match status {
        ChownStatus::Changed => style("changed").green().to_string(),
        ChownStatus::WouldChange => style("would change").cyan().to_string(),
        ChownStatus::Failed { reason } => format!("{} ({})", style("failed").red(), reason),
        ChownStatus::Skipped => style("skipped").dim().to_string(),
    }
}

fn print_json(report: &WorkflowReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
