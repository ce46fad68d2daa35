//! Mustache-style expansion of node configuration strings.
//!
//! `{{path.to.value}}` substitutes a value from the execution context and
//! `{{json path.to.value}}` substitutes its pretty-printed JSON. Paths that
//! do not resolve render as the empty string. Only the inside of `{{ }}` is
//! interpreted; every other character of the template is copied as is.

use crate::{ExecutionContext, TemplateError};
use minijinja::value::Value;
use minijinja::{Environment, Error, UndefinedBehavior};
use std::collections::BTreeMap;

/// Helpers a template may call. Nothing else is registered.
const HELPERS: &[&str] = &["json"];

/// Characters that end an unbracketed path segment.
const RESERVED: &str = "!\"#%&'()*+,./;<=>@[\\]^`{|}~";

/// Expand `template` against `context`.
pub fn render(template: &str, context: &ExecutionContext) -> Result<String, TemplateError> {
    if !template.contains("{{") {
        return Ok(template.to_string());
    }

    let env = environment();
    let root = Value::from_serialize(context);
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let (open, close) = if rest[start..].starts_with("{{{") {
            ("{{{", "}}}")
        } else {
            ("{{", "}}")
        };
        let body = start + open.len();
        let Some(len) = rest[body..].find(close) else {
            break;
        };

        rendered.push_str(&rest[..start]);
        rendered.push_str(&expand_tag(&env, &root, &rest[body..body + len])?);
        rest = &rest[body + len + close.len()..];
    }

    rendered.push_str(rest);
    Ok(rendered)
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Chainable);
    env.add_function("json", json_helper);
    env
}

fn json_helper(value: Value) -> Result<String, Error> {
    if value.is_undefined() {
        return Ok(String::new());
    }
    serde_json::to_string_pretty(&value).map_err(|e| {
        Error::new(minijinja::ErrorKind::InvalidOperation, "value is not serializable")
            .with_source(e)
    })
}

fn expand_tag(env: &Environment<'_>, root: &Value, tag: &str) -> Result<String, TemplateError> {
    let tag = tag.trim();
    if tag.starts_with('!') {
        return Ok(String::new());
    }

    let (helper, path) = match helper_call(tag) {
        Some((helper, argument)) => (Some(helper), argument),
        None => (None, tag),
    };
    let segments = parse_path(path)
        .ok_or_else(|| TemplateError::Render(format!("unsupported expression `{}`", tag)))?;

    // Segments are bound as variables so no part of the path is parsed as syntax
    let mut vars = BTreeMap::new();
    vars.insert("ctx".to_string(), root.clone());
    let mut expression = String::from("ctx");
    for (i, segment) in segments.into_iter().enumerate() {
        expression.push_str(&format!("[p{}]", i));
        vars.insert(format!("p{}", i), segment);
    }
    if let Some(helper) = helper {
        expression = format!("{}({})", helper, expression);
    }

    let value = env
        .compile_expression(&expression)
        .and_then(|compiled| compiled.eval(Value::from(vars)))
        .map_err(|e| TemplateError::Render(e.to_string()))?;

    Ok(if value.is_undefined() || value.is_none() {
        String::new()
    } else if let Some(text) = value.as_str() {
        text.to_string()
    } else {
        value.to_string()
    })
}

/// Split a path such as `a.b-c[0].['x y']` into lookup keys. `this` on its
/// own is the whole context. Returns `None` for anything that is not a path.
fn parse_path(path: &str) -> Option<Vec<Value>> {
    if path == "this" {
        return Some(Vec::new());
    }

    let mut segments = Vec::new();
    let mut chars = path.chars().peekable();
    let mut expect_segment = true;

    while let Some(&c) = chars.peek() {
        match c {
            '.' if !expect_segment => {
                chars.next();
                expect_segment = true;
            }
            '[' => {
                chars.next();
                let mut key = String::new();
                let quote = match chars.peek() {
                    Some(&q) if q == '\'' || q == '"' => {
                        chars.next();
                        Some(q)
                    }
                    _ => None,
                };
                loop {
                    match (chars.next()?, quote) {
                        (q, Some(open)) if q == open => {
                            if chars.next()? != ']' {
                                return None;
                            }
                            break;
                        }
                        (']', None) => break,
                        (ch, _) => key.push(ch),
                    }
                }
                segments.push(match (quote, key.parse::<i64>()) {
                    (None, Ok(index)) => Value::from(index),
                    _ => Value::from(key),
                });
                expect_segment = false;
            }
            _ if expect_segment => {
                let mut key = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || RESERVED.contains(ch) {
                        break;
                    }
                    key.push(ch);
                    chars.next();
                }
                if key.is_empty() {
                    return None;
                }
                segments.push(match key.parse::<i64>() {
                    Ok(index) if !segments.is_empty() => Value::from(index),
                    _ => Value::from(key),
                });
                expect_segment = false;
            }
            _ => return None,
        }
    }

    (!segments.is_empty() && !expect_segment).then_some(segments)
}

fn helper_call(expression: &str) -> Option<(&'static str, &str)> {
    let (name, argument) = expression.split_once(char::is_whitespace)?;
    let helper = HELPERS.iter().find(|h| **h == name)?;
    let argument = argument.trim();
    (!argument.is_empty()).then_some((*helper, argument))
}
