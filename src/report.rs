//! The reports sink protocol (§6.1).
use crate::value::NodeId;
use std::fmt;

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// A single diagnostic message, carrying a format string with `%s`
/// placeholders and the arguments to fill them, rather than a
/// pre-interpolated string — so a sink can re-render or filter by template.
#[derive(Debug, Clone)]
pub struct Message {
    pub severity: Severity,
    /// The I-node this message is about, used by the prettifier to render a
    /// location excerpt. `None` for messages not tied to a specific node.
    pub context: Option<NodeId>,
    pub format: &'static str,
    pub args: Vec<String>,
}

impl Message {
    #[must_use]
    pub fn new(severity: Severity, context: Option<NodeId>, format: &'static str, args: Vec<String>) -> Self {
        Message {
            severity,
            context,
            format,
            args,
        }
    }

    /// Renders this message by substituting `args` for each `%s`
    /// placeholder in `format`, in order.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.format.len());
        let mut args = self.args.iter();
        let mut rest = self.format;
        while let Some(pos) = rest.find("%s") {
            out.push_str(&rest[..pos]);
            if let Some(arg) = args.next() {
                out.push_str(arg);
            } else {
                out.push_str("%s");
            }
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.render())
    }
}

/// Abstract collaborator that accumulates diagnostics without aborting
/// traversal. Any implementation satisfying this trait suffices (§1).
pub trait Reports {
    fn add_report(&mut self, message: Message);
}

/// An in-memory, `Vec`-backed [`Reports`] sink, provided as a convenience
/// default so callers are not forced to write their own sink before they
/// can call [`crate::validate_from_str`].
#[derive(Debug, Default, Clone)]
pub struct VecReports {
    messages: Vec<Message>,
}

impl VecReports {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl Reports for VecReports {
    fn add_report(&mut self, message: Message) {
        self.messages.push(message);
    }
}
