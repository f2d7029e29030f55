//! A small Starlark writer for `BUILD.bazel` files.
//!
//! Output is fully determined by the order rules and attributes are added
//! in; nothing here sorts or timestamps.

use std::fmt::Write;

/// Header written at the top of every generated file.
pub const GENERATED_HEADER: &str = "# Generated by nixbazel. Do not edit.";

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    List(Vec<String>),
    /// Emitted verbatim, e.g. a `glob(...)` call
    Raw(String),
}

/// One rule invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    kind: String,
    attrs: Vec<(String, Value)>,
}

impl Rule {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Rule {
            kind: kind.into(),
            attrs: vec![("name".to_string(), Value::Str(name.into()))],
        }
    }

    pub fn string(mut self, attr: &str, value: impl Into<String>) -> Self {
        self.attrs.push((attr.to_string(), Value::Str(value.into())));
        self
    }

    /// Add a list attribute. Empty lists are omitted.
    pub fn list<I, S>(mut self, attr: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if !values.is_empty() {
            self.attrs.push((attr.to_string(), Value::List(values)));
        }
        self
    }

    pub fn raw(mut self, attr: &str, expr: impl Into<String>) -> Self {
        self.attrs.push((attr.to_string(), Value::Raw(expr.into())));
        self
    }

    fn render(&self, out: &mut String) {
        let _ = writeln!(out, "{}(", self.kind);
        for (attr, value) in &self.attrs {
            match value {
                Value::Str(s) => {
                    let _ = writeln!(out, "    {} = {},", attr, quote(s));
                }
                Value::List(items) if items.len() == 1 => {
                    let _ = writeln!(out, "    {} = [{}],", attr, quote(&items[0]));
                }
                Value::List(items) => {
                    let _ = writeln!(out, "    {} = [", attr);
                    for item in items {
                        let _ = writeln!(out, "        {},", quote(item));
                    }
                    let _ = writeln!(out, "    ],");
                }
                Value::Raw(expr) => {
                    let _ = writeln!(out, "    {} = {},", attr, expr);
                }
            }
        }
        out.push_str(")\n");
    }
}

/// A `BUILD.bazel` file under construction.
#[derive(Debug, Clone, Default)]
pub struct BuildFile {
    loads: Vec<(String, Vec<String>)>,
    rules: Vec<Rule>,
}

impl BuildFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, label: impl Into<String>, symbols: &[&str]) -> &mut Self {
        self.loads.push((
            label.into(),
            symbols.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn rule(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(GENERATED_HEADER);
        out.push_str("\n\n");

        for (label, symbols) in &self.loads {
            let quoted: Vec<String> = symbols.iter().map(|s| quote(s)).collect();
            let _ = writeln!(out, "load({}, {})", quote(label), quoted.join(", "));
        }
        if !self.loads.is_empty() {
            out.push('\n');
        }

        out.push_str("package(default_visibility = [\"//visibility:public\"])\n");

        for rule in &self.rules {
            out.push('\n');
            rule.render(&mut out);
        }

        out
    }
}

/// Quote a Starlark string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `glob(["**"], exclude = [...], allow_empty = True)`
///
/// Unfetched packages hold only their build file, so the glob may be empty.
pub fn glob_all_except(excludes: &[&str]) -> String {
    let quoted: Vec<String> = excludes.iter().map(|s| quote(s)).collect();
    format!(
        "glob(\n        [\"**\"],\n        exclude = [{}],\n        allow_empty = True,\n    )",
        quoted.join(", ")
    )
}
