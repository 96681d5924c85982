//! Prompt templates with `{name}` placeholders.
//!
//! A template is parsed once into literal and variable segments. `{{` and
//! `}}` render as literal braces. Rendering is strict: every declared
//! variable must be supplied and nothing undeclared may be.

use std::collections::BTreeMap;

use crate::error::PromptError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
    variables: Vec<String>,
}

impl PromptTemplate {
    /// Parse a template string.
    pub fn from_template(template: impl Into<String>) -> Result<Self, PromptError> {
        let source = template.into();
        let mut segments = Vec::new();
        let mut variables: Vec<String> = Vec::new();
        let mut literal = String::new();

        let mut chars = source.char_indices().peekable();
        while let Some((idx, c)) = chars.next() {
            match c {
                '{' if chars.peek().is_some_and(|(_, n)| *n == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|(_, n)| *n == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, nc) in chars.by_ref() {
                        if nc == '}' {
                            closed = true;
                            break;
                        }
                        name.push(nc);
                    }
                    if !closed {
                        return Err(PromptError::Unclosed(idx));
                    }
                    let name = name.trim().to_string();
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    if !variables.contains(&name) {
                        variables.push(name.clone());
                    }
                    segments.push(Segment::Variable(name));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source,
            segments,
            variables,
        })
    }

    /// Declared variables in first-appearance order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The unparsed template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fill every placeholder from `values`.
    pub fn render(&self, values: &BTreeMap<String, String>) -> Result<String, PromptError> {
        if let Some(unknown) = values.keys().find(|k| !self.variables.contains(k)) {
            return Err(PromptError::UnknownVariable(unknown.clone()));
        }

        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = values
                        .get(name)
                        .ok_or_else(|| PromptError::MissingVariable(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }

    /// Convenience wrapper over [`render`](Self::render) for literal pairs.
    pub fn render_with(&self, pairs: &[(&str, &str)]) -> Result<String, PromptError> {
        let values = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.render(&values)
    }
}
