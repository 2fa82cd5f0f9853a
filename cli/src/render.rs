//! Plain-text rendering of the engine view and the scenario content.

use std::fmt::Write as _;

use litera_engine::EngineView;
use litera_engine::litera_types::scenario::{
    ETHICAL_DILEMMA, PREBUNK_POST, PROFESSIONAL_MEETING, PostLabel,
};
use litera_engine::litera_types::{Meter, ModuleId, RelationshipMap, StatusMessage};

const BAR_WIDTH: usize = 20;
const LABEL_WIDTH: usize = 20;

/// `Public Trust          55 [###########---------]`
///
/// The number is shown as received; only the bar is clamped to `0..=100`.
#[must_use]
pub fn meter_line(label: &str, meter: &Meter) -> String {
    let filled = (meter.as_f64().clamp(0.0, 100.0) * BAR_WIDTH as f64 / 100.0) as usize;
    let filled = filled.min(BAR_WIDTH);
    let empty = BAR_WIDTH - filled;
    format!(
        "{label:<LABEL_WIDTH$}{value:>4} [{bar}{rest}]",
        value = meter.to_string(),
        bar = "#".repeat(filled),
        rest = "-".repeat(empty),
    )
}

fn relationship_lines(relationships: &RelationshipMap, out: &mut String) {
    if relationships.is_empty() {
        out.push_str("  no interactions yet\n");
        return;
    }
    for (subject, value) in relationships {
        match value.as_str() {
            Some(text) => {
                let _ = writeln!(out, "  {subject}: {text}");
            }
            None => {
                let _ = writeln!(out, "  {subject}: {value}");
            }
        }
    }
}

/// `Status: ...`, flagged with `[!]` when the last call failed.
#[must_use]
pub fn status_line(status: &StatusMessage) -> String {
    if status.is_failure() {
        format!("Status: [!] {status}")
    } else {
        format!("Status: {status}")
    }
}

#[must_use]
pub fn view(view: &EngineView<'_>) -> String {
    let mut out = String::new();
    let identifier = if view.identifier.trim().is_empty() {
        "(none)"
    } else {
        view.identifier
    };
    let _ = writeln!(out, "Session: {identifier}");
    let progress = view.progress;
    let _ = writeln!(out, "{}", meter_line("Public Trust", &progress.public_trust));
    let _ = writeln!(out, "{}", meter_line("Personal Clout", &progress.personal_clout));
    let _ = writeln!(
        out,
        "{}",
        meter_line("Professional Skill", &progress.professional_skill)
    );
    out.push_str("Relationships:\n");
    relationship_lines(&progress.relationships, &mut out);
    if let Some(status) = view.status {
        let _ = writeln!(out, "{}", status_line(status));
    }
    if view.busy {
        out.push_str("(request in flight)\n");
    }
    out
}

#[must_use]
pub fn scenarios() -> String {
    let mut out = String::new();

    let _ = writeln!(out, "[{}]", ModuleId::Prebunking.display_name());
    let _ = writeln!(out, "  {}", PREBUNK_POST.content);
    let _ = writeln!(out, "  source: {}", PREBUNK_POST.source);
    let labels: Vec<&str> = PostLabel::ALL.iter().map(|label| label.as_str()).collect();
    let _ = writeln!(out, "  label <{}>", labels.join("|"));
    out.push('\n');

    let _ = writeln!(out, "[{}]", ModuleId::Ethical.display_name());
    let _ = writeln!(out, "  {}", ETHICAL_DILEMMA.context);
    for option in ETHICAL_DILEMMA.options {
        let _ = writeln!(out, "  ethical {:<12} {}", option.key, option.label);
    }
    out.push('\n');

    let _ = writeln!(out, "[{}]", ModuleId::Professional.display_name());
    let _ = writeln!(out, "  {}", PROFESSIONAL_MEETING.context);
    for (index, attempt) in PROFESSIONAL_MEETING.attempts.iter().enumerate() {
        let _ = writeln!(out, "  pro {}  {}", index + 1, attempt.label);
    }
    out
}
