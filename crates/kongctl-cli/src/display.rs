//! Terminal rendering of plans and reports

use std::collections::BTreeMap;

use console::{Style, style};
use serde_json::Value as JsonValue;
use similar::{ChangeTag, TextDiff};

use kongctl_plan::{Action, ChangeState, Plan, PlannedChange, Report};

/// One-line plan summary, e.g. `3 to create, 1 to update, 2 to delete`.
pub fn summary(plan: &Plan) -> String {
    let count = |action: Action| {
        plan.changes
            .iter()
            .filter(|c| c.action == action)
            .count()
    };
    let mut parts = Vec::new();
    let creates = count(Action::Create);
    let updates = count(Action::Update);
    let deletes = count(Action::Delete);
    if creates > 0 {
        parts.push(format!("{creates} to create"));
    }
    if updates > 0 {
        parts.push(format!("{updates} to update"));
    }
    if deletes > 0 {
        parts.push(format!("{deletes} to delete"));
    }
    if parts.is_empty() {
        "No changes".to_string()
    } else {
        parts.join(", ")
    }
}

/// Full colored plan rendering, one block per change in execution order.
pub fn render_plan(plan: &Plan) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{}\n\n",
        style(format!(
            "Plan ({} mode): {}",
            plan.metadata.mode,
            summary(plan)
        ))
        .bold()
    ));

    for id in &plan.execution_order {
        let Some(change) = plan.change(id) else {
            continue;
        };
        let (symbol, header_style) = match change.action {
            Action::Create => ("+", Style::new().green().bold()),
            Action::Update => ("~", Style::new().yellow().bold()),
            Action::Delete => ("-", Style::new().red().bold()),
        };
        output.push_str(&format!(
            "{} {} {} {}\n",
            header_style.apply_to(symbol),
            change.resource_type,
            style(&change.resource_ref).bold(),
            style(format!("[{}]", change.namespace)).dim(),
        ));
        render_fields(&mut output, change);
    }

    output
}

fn render_fields(output: &mut String, change: &PlannedChange) {
    match change.action {
        Action::Create => {
            for (field, value) in &change.fields {
                if field == "api_id" {
                    continue;
                }
                output.push_str(&format!(
                    "    {}: {}\n",
                    field,
                    style(compact(value)).green()
                ));
            }
        }
        Action::Update => {
            for (field, diff) in &change.fields {
                if field == "api_id" {
                    continue;
                }
                let old = diff.get("old").cloned().unwrap_or(JsonValue::Null);
                let new = diff.get("new").cloned().unwrap_or(JsonValue::Null);
                if is_multiline(&old) || is_multiline(&new) {
                    output.push_str(&format!("    {field}:\n"));
                    render_text_diff(output, &text_of(&old), &text_of(&new));
                } else {
                    output.push_str(&format!(
                        "    {}: {} {} {}\n",
                        field,
                        style(compact(&old)).red(),
                        style("→").dim(),
                        style(compact(&new)).green(),
                    ));
                }
            }
            if let Some(transition) = change.protection.and_then(|p| p.transition()) {
                output.push_str(&format!(
                    "    protected: {} {} {}\n",
                    style(transition.old).red(),
                    style("→").dim(),
                    style(transition.new).green(),
                ));
            }
        }
        Action::Delete => {}
    }
}

fn render_text_diff(output: &mut String, old: &str, new: &str) {
    let diff = TextDiff::from_lines(old, new);
    for line in diff.iter_all_changes() {
        let (prefix, line_style) = match line.tag() {
            ChangeTag::Delete => ("-", Style::new().red()),
            ChangeTag::Insert => ("+", Style::new().green()),
            ChangeTag::Equal => (" ", Style::new().dim()),
        };
        output.push_str(&format!(
            "      {}{}\n",
            prefix,
            line_style.apply_to(line.value().trim_end())
        ));
    }
}

fn is_multiline(value: &JsonValue) -> bool {
    value.as_str().is_some_and(|s| s.contains('\n'))
}

fn text_of(value: &JsonValue) -> String {
    value.as_str().map(String::from).unwrap_or_default()
}

fn compact(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => format!("\"{s}\""),
        JsonValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Render the execution report: one line per outcome, then counts.
pub fn render_report(report: &Report) -> String {
    let mut output = String::new();

    if report.dry_run {
        output.push_str(&format!("{}\n", style("Dry run - no changes applied").bold()));
    }

    for outcome in &report.outcomes {
        let (mark, mark_style) = match outcome.state {
            ChangeState::Applied => ("✓", Style::new().green()),
            ChangeState::Failed => ("✗", Style::new().red()),
            ChangeState::Skipped => ("↷", Style::new().yellow()),
            _ => ("·", Style::new().dim()),
        };
        let detail = match (&outcome.error, &outcome.remote_id) {
            (Some(error), _) => format!(" ({error})"),
            (None, Some(id)) => format!(" ({id})"),
            _ => String::new(),
        };
        output.push_str(&format!(
            "{} {} {} {}{}\n",
            mark_style.apply_to(mark),
            outcome.action,
            outcome.resource_type,
            outcome.resource_ref,
            style(detail).dim(),
        ));
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    counts.insert("applied", report.success_count);
    counts.insert("failed", report.failure_count);
    counts.insert("skipped", report.skipped_count);
    let line = counts
        .iter()
        .filter(|(_, v)| **v > 0)
        .map(|(k, v)| format!("{v} {k}"))
        .collect::<Vec<_>>()
        .join(", ");
    output.push_str(&format!(
        "\n{}\n",
        style(if line.is_empty() {
            "Nothing to do".to_string()
        } else {
            line
        })
        .bold()
    ));

    output
}
