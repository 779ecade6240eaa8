//! Terminal rendering for specifications: comfy-table layouts, status colors
//! and the progress spinner shown while the workflow runs.

use std::time::Duration;

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::truncate;
use crate::domain::models::{Specification, UrlHealth, ValidationResult, ValidationStatus};

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const DESCRIPTION_WIDTH: usize = 60;

/// Create a spinner for an operation of unknown length.
pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS);
    spinner.set_style(style);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Borderless two-column key/value table.
fn detail_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Borderless list table with upper-cased headers.
fn list_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h.to_uppercase()).set_alignment(CellAlignment::Left)),
        );
    table
}

/// Color a validation status for the terminal.
pub fn status_style(status: ValidationStatus) -> StyledObject<&'static str> {
    let text = status.as_str();
    match status {
        ValidationStatus::Valid | ValidationStatus::UserApproved => style(text).green(),
        ValidationStatus::NeedsHumanApproval | ValidationStatus::Pending => style(text).cyan(),
        ValidationStatus::NeedsHumanReview | ValidationStatus::NeedsClarification => {
            style(text).yellow()
        }
        _ => style(text).red(),
    }
}

fn health_style(health: UrlHealth) -> StyledObject<&'static str> {
    match health {
        UrlHealth::Healthy => style(health.as_str()).green(),
        UrlHealth::Unhealthy => style(health.as_str()).red(),
        UrlHealth::Unknown => style(health.as_str()).dim(),
    }
}

/// Render a specification for a reviewer.
pub fn render_specification(spec: &Specification) -> String {
    let mut sections = Vec::new();

    let mut summary = detail_table();
    summary.add_row(vec![
        Cell::new(style("Spec").bold().to_string()),
        Cell::new(spec.spec_id()),
    ]);
    summary.add_row(vec![
        Cell::new(style("Query").bold().to_string()),
        Cell::new(spec.original_query()),
    ]);
    summary.add_row(vec![
        Cell::new(style("Status").bold().to_string()),
        Cell::new(status_style(spec.validation_status).to_string()),
    ]);
    if !spec.technical_requirements.is_empty() {
        let requirements: Vec<&str> = spec.technical_requirements.iter().map(String::as_str).collect();
        summary.add_row(vec![
            Cell::new(style("Requirements").bold().to_string()),
            Cell::new(requirements.join(", ")),
        ]);
    }
    for (key, value) in &spec.constraints {
        summary.add_row(vec![
            Cell::new(style(format!("Constraint {key}")).bold().to_string()),
            Cell::new(value.to_string()),
        ]);
    }
    sections.push(summary.to_string());

    if spec.target_urls().is_empty() {
        sections.push(style("No target URLs.").yellow().to_string());
    } else {
        let mut urls = list_table(&["url", "health"]);
        for url in spec.target_urls() {
            let health = spec
                .url_health_status
                .get(url)
                .copied()
                .unwrap_or(UrlHealth::Unknown);
            urls.add_row(vec![
                Cell::new(url),
                Cell::new(health_style(health).to_string()),
            ]);
        }
        sections.push(urls.to_string());
    }

    if spec.fields_to_extract().is_empty() {
        sections.push(style("No fields to extract.").yellow().to_string());
    } else {
        let mut fields = list_table(&["field", "description"]);
        for field in spec.fields_to_extract() {
            fields.add_row(vec![
                Cell::new(&field.name),
                Cell::new(truncate(
                    field.description.as_deref().unwrap_or("-"),
                    DESCRIPTION_WIDTH,
                )),
            ]);
        }
        sections.push(fields.to_string());
    }

    if !spec.clarification_questions.is_empty() {
        let mut lines = vec![style("Questions:").bold().to_string()];
        lines.extend(spec.clarification_questions.iter().map(|q| format!("  ? {q}")));
        sections.push(lines.join("\n"));
    }

    if let Some(latest) = spec.critique_history().last() {
        sections.push(format!("{} {}", style("Latest critique:").dim(), latest));
    }

    sections.join("\n\n")
}

/// Render the issues of a failed validation round.
pub fn render_validation(result: &ValidationResult) -> String {
    if result.is_valid {
        return style("Validation passed.").green().to_string();
    }
    let mut lines = vec![format!(
        "{} ({})",
        style("Validation failed").red().bold(),
        status_style(result.status)
    )];
    lines.extend(result.issues.iter().map(|issue| format!("  - {issue}")));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::FieldToExtract;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_specification_lists_urls_and_fields() {
        let spec = Specification::create_new(
            "Get price from https://example.com",
            vec!["https://example.com".to_string()],
            vec![FieldToExtract::new("price").with_description("Listed price")],
            BTreeMap::new(),
        );
        let rendered = render_specification(&spec);
        assert!(rendered.contains("https://example.com"));
        assert!(rendered.contains("price"));
        assert!(rendered.contains("Listed price"));
        assert!(rendered.contains(spec.spec_id()));
    }

    #[test]
    fn test_render_specification_empty_sections() {
        let spec = Specification::empty_input_fallback("");
        let rendered = render_specification(&spec);
        assert!(rendered.contains("No target URLs."));
        assert!(rendered.contains("No fields to extract."));
    }

    #[test]
    fn test_render_validation_lists_issues() {
        let result = ValidationResult::unreachable(&["https://down.example".to_string()]);
        let rendered = render_validation(&result);
        assert!(rendered.contains("https://down.example"));
    }
}
