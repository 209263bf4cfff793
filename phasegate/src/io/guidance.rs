//! Phase guidance text surfaced to the orchestrating agent.

use anyhow::Result;
use minijinja::{Environment, context};

use crate::core::phases::PhaseTable;
use crate::core::types::Phase;

const GUIDANCE_TEMPLATE: &str = include_str!("templates/guidance.md");

/// Template engine wrapper around minijinja.
struct GuidanceEngine {
    env: Environment<'static>,
}

impl GuidanceEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("guidance", GUIDANCE_TEMPLATE)
            .expect("guidance template should be valid");
        Self { env }
    }

    fn render(
        &self,
        headline: &str,
        table: &PhaseTable,
        phase: Phase,
        expected_path: Option<&str>,
    ) -> Result<String> {
        let template = self.env.get_template("guidance")?;
        let spec = table.get(phase);
        let phases: Vec<&str> = table.phases().map(Phase::as_str).collect();
        let rendered = template.render(context! {
            headline => headline.trim(),
            phase => phase.as_str(),
            position => table.position(phase).map(|i| i + 1).unwrap_or(0),
            total => phases.len(),
            phases => phases,
            actor => spec.and_then(|s| s.required_actor).map(|a| a.as_str()),
            criterion => spec.map(|s| s.exit.describe()).unwrap_or_default(),
            expected_path => expected_path,
            next => table.next(phase).map(Phase::as_str),
        })?;
        Ok(rendered.trim_end().to_string())
    }
}

/// Render the guidance block for `phase`.
pub fn render_guidance(
    headline: &str,
    table: &PhaseTable,
    phase: Phase,
    expected_path: Option<&str>,
) -> Result<String> {
    GuidanceEngine::new().render(headline, table, phase, expected_path)
}
