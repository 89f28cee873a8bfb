//! View model to paint commands, and a painter that prints them.

use std::collections::HashMap;
use std::io::{self, Write};

use feedlens_core::{AppViewModel, ItemRowView, LabelScore, LoaderView, StyleMarker};

pub const DETAIL_BUTTON_LABEL: &str = "LK-AI";
pub const REVOKE_ACTION_LABEL: &str = "Remove negative";

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    /// Adds the detail button next to the item's description.
    AttachDetailButton { key: String, label: &'static str },
    /// Status line and one tag per label; hidden until toggled.
    SetDetails {
        key: String,
        visible: bool,
        status_line: String,
        tags: Vec<String>,
    },
    SetStyle { key: String, class: Option<&'static str> },
    SetRevokeAction { key: String, label: &'static str, enabled: bool },
    SetLoader { text: Option<String> },
    SetStatus { text: String },
}

impl PaintCommand {
    /// The painted element this command targets; later commands replace earlier ones.
    fn target(&self) -> String {
        match self {
            PaintCommand::AttachDetailButton { key, .. } => format!("{key}#button"),
            PaintCommand::SetDetails { key, .. } => format!("{key}#details"),
            PaintCommand::SetStyle { key, .. } => format!("{key}#style"),
            PaintCommand::SetRevokeAction { key, .. } => format!("{key}#revoke"),
            PaintCommand::SetLoader { .. } => "#loader".to_string(),
            PaintCommand::SetStatus { .. } => "#status".to_string(),
        }
    }
}

pub fn render(view: &AppViewModel) -> Vec<PaintCommand> {
    let mut cmds = vec![
        PaintCommand::SetLoader {
            text: match &view.loader {
                LoaderView::Hidden => None,
                LoaderView::Visible { text } => Some(text.clone()),
            },
        },
        PaintCommand::SetStatus {
            text: format!(
                "Posts: {} | Pending: {} | Classified: {}",
                view.processed_count, view.pending_count, view.classified_count
            ),
        },
    ];
    for row in &view.items {
        render_row(row, &mut cmds);
    }
    cmds
}

/// Only classified items get painted.
fn render_row(row: &ItemRowView, cmds: &mut Vec<PaintCommand>) {
    let Some(style) = row.style else {
        return;
    };
    cmds.push(PaintCommand::AttachDetailButton {
        key: row.key.clone(),
        label: DETAIL_BUTTON_LABEL,
    });
    cmds.push(PaintCommand::SetDetails {
        key: row.key.clone(),
        visible: row.details_open,
        status_line: row.status_line.clone(),
        tags: row.scores.iter().map(format_tag).collect(),
    });
    cmds.push(PaintCommand::SetStyle {
        key: row.key.clone(),
        class: style_class(style),
    });
    cmds.push(PaintCommand::SetRevokeAction {
        key: row.key.clone(),
        label: REVOKE_ACTION_LABEL,
        enabled: row.can_revoke,
    });
}

pub fn style_class(style: StyleMarker) -> Option<&'static str> {
    match style {
        StyleMarker::Negative => Some("negative-post"),
        StyleMarker::Positive => Some("positive-post"),
        StyleMarker::Cleared => None,
    }
}

pub fn format_tag(score: &LabelScore) -> String {
    format!("{}: {:.2}%", score.label, score.score * 100.0)
}

/// Prints each command whose target changed since it was last painted.
pub struct TerminalPainter<W: Write> {
    out: W,
    painted: HashMap<String, PaintCommand>,
}

impl<W: Write> TerminalPainter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            painted: HashMap::new(),
        }
    }

    pub fn apply(&mut self, commands: Vec<PaintCommand>) -> io::Result<()> {
        for command in commands {
            let target = command.target();
            if self.painted.get(&target) == Some(&command) {
                continue;
            }
            if let Some(line) = describe(&command) {
                writeln!(self.out, "{line}")?;
            }
            self.painted.insert(target, command);
        }
        self.out.flush()
    }

    #[cfg(test)]
    pub(crate) fn output(&self) -> &W {
        &self.out
    }
}

fn describe(command: &PaintCommand) -> Option<String> {
    let line = match command {
        PaintCommand::AttachDetailButton { key, label } => format!("[{key}] [{label}]"),
        PaintCommand::SetDetails {
            key,
            visible: true,
            status_line,
            tags,
        } => format!("[{key}] {status_line} {}", tags.join(" | ")),
        PaintCommand::SetDetails { key, visible: false, .. } => format!("[{key}] details hidden"),
        PaintCommand::SetStyle { key, class: Some(class) } => format!("[{key}] style {class}"),
        PaintCommand::SetStyle { key, class: None } => format!("[{key}] style cleared"),
        PaintCommand::SetRevokeAction {
            key,
            label,
            enabled: true,
        } => format!("[{key}] [{label}]"),
        PaintCommand::SetRevokeAction { enabled: false, .. } => return None,
        PaintCommand::SetLoader { text: Some(text) } => text.clone(),
        PaintCommand::SetLoader { text: None } => return None,
        PaintCommand::SetStatus { text } => text.clone(),
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedlens_core::{Classification, ItemPhase};
    use pretty_assertions::assert_eq;

    fn scores() -> Vec<LabelScore> {
        vec![
            LabelScore {
                label: "rust".to_string(),
                score: 0.1234,
            },
            LabelScore {
                label: "sport".to_string(),
                score: 0.05,
            },
        ]
    }

    fn row(style: Option<StyleMarker>, details_open: bool) -> ItemRowView {
        ItemRowView {
            key: "urn:1".to_string(),
            phase: ItemPhase::Classified(Classification::from_scores(scores())),
            status_line: "Post processed - \"Nous recrutons...\"".to_string(),
            scores: scores(),
            details_open,
            style,
            can_revoke: style == Some(StyleMarker::Negative),
        }
    }

    fn view(rows: Vec<ItemRowView>) -> AppViewModel {
        AppViewModel {
            processed_count: rows.len(),
            classified_count: rows.len(),
            items: rows,
            ..AppViewModel::default()
        }
    }

    #[test]
    fn tags_show_two_decimal_percentages() {
        assert_eq!(format_tag(&scores()[0]), "rust: 12.34%");
        assert_eq!(format_tag(&scores()[1]), "sport: 5.00%");
    }

    #[test]
    fn negative_item_gets_marker_and_revoke_action() {
        let cmds = render(&view(vec![row(Some(StyleMarker::Negative), false)]));
        assert!(cmds.contains(&PaintCommand::AttachDetailButton {
            key: "urn:1".to_string(),
            label: "LK-AI",
        }));
        assert!(cmds.contains(&PaintCommand::SetStyle {
            key: "urn:1".to_string(),
            class: Some("negative-post"),
        }));
        assert!(cmds.contains(&PaintCommand::SetRevokeAction {
            key: "urn:1".to_string(),
            label: "Remove negative",
            enabled: true,
        }));
        assert!(cmds.contains(&PaintCommand::SetDetails {
            key: "urn:1".to_string(),
            visible: false,
            status_line: "Post processed - \"Nous recrutons...\"".to_string(),
            tags: vec!["rust: 12.34%".to_string(), "sport: 5.00%".to_string()],
        }));
    }

    #[test]
    fn unclassified_items_are_not_painted() {
        let mut pending = row(None, false);
        pending.phase = ItemPhase::Pending { attempt: 1 };
        let cmds = render(&view(vec![pending]));
        assert_eq!(cmds.len(), 2);
    }

    #[test]
    fn loader_text_is_painted_while_visible() {
        let model = AppViewModel {
            loader: LoaderView::Visible {
                text: "Loading model: 42%".to_string(),
            },
            ..AppViewModel::default()
        };
        assert_eq!(
            render(&model)[0],
            PaintCommand::SetLoader {
                text: Some("Loading model: 42%".to_string())
            }
        );
    }

    #[test]
    fn painter_prints_only_changes() {
        let mut painter = TerminalPainter::new(Vec::new());
        painter
            .apply(render(&view(vec![row(Some(StyleMarker::Positive), false)])))
            .unwrap();
        painter
            .apply(render(&view(vec![row(Some(StyleMarker::Positive), true)])))
            .unwrap();

        let printed = String::from_utf8(painter.output().clone()).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Posts: 1 | Pending: 0 | Classified: 1",
                "[urn:1] [LK-AI]",
                "[urn:1] details hidden",
                "[urn:1] style positive-post",
                "[urn:1] Post processed - \"Nous recrutons...\" rust: 12.34% | sport: 5.00%",
            ]
        );
    }
}
