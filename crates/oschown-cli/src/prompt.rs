//! Confirmation before real mutation.
//!
//! Shows the resolved plan and asks before any ownership is changed.
//! Uses dialoguer for the terminal prompt.

use std::io::{self, Write};

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

use oschown_core::types::ChownContext;
use oschown_core::workflow::WorkflowReport;

/// Summary of a dry-run plan followed by a yes/no prompt.
pub struct PlanPrompt<W: Write = io::Stdout> {
    writer: W,
    theme: ColorfulTheme,
    assume_yes: bool,
}

impl PlanPrompt<io::Stdout> {
    pub fn new() -> Self {
        Self {
            writer: io::stdout(),
            theme: ColorfulTheme::default(),
            assume_yes: false,
        }
    }
}

impl<W: Write> PlanPrompt<W> {
    /// Prompt with a custom writer that never asks (for testing).
    #[cfg(test)]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            theme: ColorfulTheme::default(),
            assume_yes: true,
        }
    }

    pub fn confirm(&mut self, plan: &WorkflowReport, ctx: &ChownContext) -> Result<bool> {
        self.print_summary(plan, ctx)?;

        if self.assume_yes {
            return Ok(true);
        }

        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt(format!("Change ownership of {} resources?", plan.resolved.len()))
            .default(false)
            .interact()?;

        Ok(confirmed)
    }

    fn print_summary(&mut self, plan: &WorkflowReport, ctx: &ChownContext) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", style("  Ownership change").bold())?;
        writeln!(self.writer, "  ───────────────────────────")?;
        writeln!(
            self.writer,
            "  User:     {}",
            style(ctx.target_user_id()).green()
        )?;
        writeln!(
            self.writer,
            "  Project:  {}",
            style(ctx.target_project_id()).green()
        )?;
        writeln!(self.writer, "  Resources:")?;
        for id in &plan.resolved {
            writeln!(self.writer, "    {}", id)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}

/// Show the plan on stdout and ask for confirmation.
pub fn confirm_plan(plan: &WorkflowReport, ctx: &ChownContext) -> Result<bool> {
    PlanPrompt::new().confirm(plan, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oschown_core::provider::ProviderRegistry;
    use oschown_core::workflow::{RootWorkflow, Workflow};

    #[test]
    fn test_summary_lists_target_and_resources() {
        let ctx = ChownContext::new("u-1", "p-1", true);
        let mut plan = RootWorkflow::nova().run(&ProviderRegistry::new(), &ctx, "INSTANCE1");
        plan.resolved = plan.unresolved.clone();

        let mut out = Vec::new();
        let confirmed = PlanPrompt::with_writer(&mut out).confirm(&plan, &ctx).unwrap();
        assert!(confirmed);

        let text = console::strip_ansi_codes(&String::from_utf8(out).unwrap()).to_string();
        assert!(text.contains("User:     u-1"));
        assert!(text.contains("Project:  p-1"));
        assert!(text.contains("    nova:INSTANCE1"));
    }
}
