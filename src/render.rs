//! Terminal rendering for the chat loop.
//!
//! - Live reasoning streams dimmed under a "Thinking" header
//! - The answer streams in plain text once it starts
//! - Errors in red, empty generations in yellow
//!
//! All output goes through a `Write` so tests can capture it.

use std::io::Write;

use crate::chat::{AssistantEntry, LiveView, ReplyStatus, TranscriptEntry, ViewObserver};

/// ANSI color codes for terminal output.
pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const CYAN: &str = "\x1b[36m";
pub const RED: &str = "\x1b[31m";
pub const YELLOW: &str = "\x1b[33m";
pub const GREEN: &str = "\x1b[32m";
pub const DIM: &str = "\x1b[2m";

/// Wraps text in an ANSI code when color is on.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub color: bool,
}

impl Style {
    /// Color when stdout is a terminal.
    pub fn detect() -> Self {
        use std::io::IsTerminal;
        Self {
            color: std::io::stdout().is_terminal(),
        }
    }

    pub fn paint(&self, code: &str, text: &str) -> String {
        if self.color && !text.is_empty() {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Idle,
    Reasoning,
    Answer,
}

// ─── LiveRenderer ────────────────────────────────────────────────────────────

/// Renders one streaming reply incrementally.
///
/// Views only ever extend what was shown, so the renderer writes suffixes;
/// when a view is not an extension it starts a new line and reprints.
pub struct LiveRenderer<W: Write> {
    out: W,
    style: Style,
    show_thinking: bool,
    section: Section,
    printed_reasoning: String,
    printed_visible: String,
    /// The reasoning on screen has not seen its close tag yet.
    reasoning_open: bool,
}

impl<W: Write> LiveRenderer<W> {
    pub fn new(out: W, style: Style, show_thinking: bool) -> Self {
        Self {
            out,
            style,
            show_thinking,
            section: Section::Idle,
            printed_reasoning: String::new(),
            printed_visible: String::new(),
            reasoning_open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print whatever the final entry adds to the live output.
    pub fn finish(&mut self, entry: &AssistantEntry) {
        if entry.is_error() {
            if self.reasoning_open && self.section == Section::Reasoning {
                let note = self.style.paint(DIM, " (interrupted)");
                let _ = write!(self.out, "{note}");
            }
            self.break_line();
            let text = self.style.paint(RED, &entry.response);
            let _ = write!(self.out, "{text}");
        } else if entry.status == ReplyStatus::EmptyGeneration {
            self.break_line();
            let text = self.style.paint(YELLOW, &entry.response);
            let _ = write!(self.out, "{text}");
        } else {
            self.enter(Section::Answer);
            self.emit_answer(&entry.response);
        }
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }

    fn enter(&mut self, section: Section) {
        if self.section == section {
            return;
        }
        match section {
            Section::Reasoning => {
                self.break_line();
                let header = self.style.paint(DIM, "💭 Thinking…");
                let _ = writeln!(self.out, "{header}");
            }
            Section::Answer if self.section == Section::Reasoning => {
                let _ = write!(self.out, "\n\n");
            }
            _ => {}
        }
        self.section = section;
    }

    /// Start a fresh line unless nothing has been printed on this one.
    fn break_line(&mut self) {
        if self.section != Section::Idle {
            let _ = writeln!(self.out);
        }
    }

    fn emit_reasoning(&mut self, text: &str) {
        let delta = match text.strip_prefix(self.printed_reasoning.as_str()) {
            Some(rest) => rest.to_string(),
            None => format!("\n{text}"),
        };
        let painted = self.style.paint(DIM, &delta);
        let _ = write!(self.out, "{painted}");
        self.printed_reasoning = text.to_string();
    }

    fn emit_answer(&mut self, text: &str) {
        let delta = match text.strip_prefix(self.printed_visible.as_str()) {
            Some(rest) => rest.to_string(),
            None => format!("\n{text}"),
        };
        let _ = write!(self.out, "{delta}");
        self.printed_visible = text.to_string();
    }
}

impl<W: Write> ViewObserver for LiveRenderer<W> {
    fn on_view(&mut self, view: &LiveView) {
        if self.show_thinking {
            if let Some(reasoning) = &view.reasoning {
                if reasoning.text != self.printed_reasoning {
                    self.enter(Section::Reasoning);
                    self.emit_reasoning(&reasoning.text);
                }
                self.reasoning_open = !reasoning.complete;
            }
        }
        if !view.visible.is_empty() && view.visible != self.printed_visible {
            self.enter(Section::Answer);
            self.emit_answer(&view.visible);
        }
        let _ = self.out.flush();
    }
}

// ─── Transcript rendering ────────────────────────────────────────────────────

/// Write one transcript entry the way `/history` shows it.
pub fn write_entry<W: Write>(
    out: &mut W,
    entry: &TranscriptEntry,
    style: Style,
    show_thinking: bool,
) -> std::io::Result<()> {
    match entry {
        TranscriptEntry::User(user) => {
            writeln!(out, "{} {}", style.paint(CYAN, "you ›"), user.content)
        }
        TranscriptEntry::Assistant(reply) => {
            writeln!(out, "{}", style.paint(GREEN, "assistant ›"))?;
            if show_thinking {
                if let Some(think) = &reply.think {
                    writeln!(out, "{}", style.paint(DIM, "💭 What the assistant thought:"))?;
                    for line in think.lines() {
                        writeln!(out, "{}", style.paint(DIM, &format!("│ {line}")))?;
                    }
                }
            }
            let body = if reply.is_error() {
                style.paint(RED, &reply.response)
            } else if reply.status == ReplyStatus::EmptyGeneration {
                style.paint(YELLOW, &reply.response)
            } else {
                reply.response.clone()
            };
            writeln!(out, "{body}")
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
