use std::collections::BTreeMap;
use std::fmt::{self, Write};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::value::{coerce, Value};

/// An argument or option value as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// A coerced literal: `42`, `true`, `"a b"`, `/tmp/x`.
    Literal(Value),
    /// `$name`, looked up in the store when the action runs.
    Var(String),
}

impl Serialize for Arg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Arg::Literal(value) => value.serialize(serializer),
            Arg::Var(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("var", name)?;
                map.end()
            }
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Literal(value)
    }
}

/// One parsed command invocation, plus everything nested under it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    /// Registry key of the implementation to call.
    pub command: String,
    pub args: Vec<Arg>,
    /// Last occurrence of a repeated option wins.
    pub options: BTreeMap<String, Arg>,
    /// `$name = ...` target. `None` discards the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_variable: Option<String>,
    /// Top-level commands of the `{ ... }` block following this one.
    pub children: Vec<Action>,
    /// 1-indexed line the command starts on.
    pub line: usize,
    /// Line following the command, or following its closing `}`.
    pub next_line: usize,
}

impl Action {
    /// Whether the reserved async option is present, whatever its value.
    pub fn is_async(&self) -> bool {
        self.options.contains_key(crate::ASYNC_OPTION)
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        f.write_str(&pad)?;
        if let Some(name) = &self.set_variable {
            write!(f, "${} = ", name)?;
        }
        f.write_str(&self.command)?;
        for arg in &self.args {
            f.write_char(' ')?;
            render_arg(f, arg)?;
        }
        for (name, value) in &self.options {
            write!(f, " --{}", name)?;
            if *value != Arg::Literal(Value::Bool(true)) {
                f.write_char('=')?;
                render_arg(f, value)?;
            }
        }
        if self.children.is_empty() {
            return f.write_char('\n');
        }
        f.write_str(" {\n")?;
        for child in &self.children {
            child.render(f, depth + 1)?;
        }
        writeln!(f, "{}}}", pad)
    }
}

/// Renders normalized source: one command per line, blocks opened on the
/// command line and closed on their own line, two-space indentation.
impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}

fn render_arg(f: &mut fmt::Formatter<'_>, arg: &Arg) -> fmt::Result {
    match arg {
        Arg::Var(name) => write!(f, "${}", name),
        Arg::Literal(Value::Str(s)) => render_text(f, s),
        Arg::Literal(Value::Absent) => f.write_str("\"\""),
        Arg::Literal(value @ Value::List(_)) => render_text(f, &value.to_string()),
        Arg::Literal(value) => write!(f, "{}", value),
    }
}

fn render_text(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    let bare_ok = !s.is_empty()
        && !s.starts_with('$')
        && !s.starts_with("--")
        && !s.starts_with('#')
        && !s
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\\' | '{' | '}'))
        && coerce(s) == Value::Str(s.to_string());
    if bare_ok {
        return f.write_str(s);
    }
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            other => f.write_char(other)?,
        }
    }
    f.write_char('"')
}

/// Render a whole program back to normalized source.
pub fn render(actions: &[Action]) -> String {
    actions.iter().map(ToString::to_string).collect()
}
