use std::collections::HashMap;
use std::fmt::Write;

use serde_json::Value;

use super::{ClientGenerator, CodegenError};
use crate::introspection::{Document, FunctionDescription};
use crate::schema::Schema;

/// Renders a single-file Python client built on `requests`.
#[derive(Debug, Clone)]
pub struct PythonClientGenerator {
    endpoint_url: String,
}

impl PythonClientGenerator {
    /// `base_url` is the server origin, `path` the dispatch route.
    pub fn new(base_url: impl AsRef<str>, path: impl AsRef<str>) -> Self {
        let base = base_url.as_ref().trim_end_matches('/');
        let path = path.as_ref();
        let endpoint_url = if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        };
        Self { endpoint_url }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }
}

impl ClientGenerator for PythonClientGenerator {
    fn language(&self) -> &'static str {
        "python"
    }

    fn content_type(&self) -> &'static str {
        "text/x-python; charset=utf-8"
    }

    #[tracing::instrument(name = "rpckit.codegen.python", skip_all, fields(title = %document.title))]
    fn generate(&self, document: &Document) -> Result<String, CodegenError> {
        let mut out = String::new();
        writeln!(
            out,
            "# Client for {} {}. Generated, do not edit.",
            document.title, document.version
        )?;
        writeln!(out, "import requests")?;
        writeln!(out, "from typing import Any, TypedDict")?;
        write!(
            out,
            r#"

def _execute(name: str, arg: Any) -> Any:
    response = requests.post('{url}', json={{"name": name, "arg": arg}})
    result = response.json()
    if result['error']:
        raise Exception(result['error'])
    return result['result']
"#,
            url = py_str(&self.endpoint_url)
        )?;

        // First declaration of an alias name wins across the whole tree.
        let mut emitted: HashMap<&str, &Schema> = HashMap::new();
        let mut models = Vec::new();
        document.root.walk(&mut |module| {
            for model in &module.models {
                if !emitted.contains_key(model.name.as_str()) {
                    emitted.insert(&model.name, &model.schema);
                    models.push((model.name.as_str(), &model.schema));
                }
            }
        });
        for (name, schema) in &models {
            write_model(&mut out, name, schema)?;
        }

        let functions = document.reachable_functions();
        for function in &functions {
            write_function(&mut out, function, &emitted)?;
        }

        tracing::debug!(
            models = models.len(),
            functions = functions.len(),
            "Generated Python client"
        );
        Ok(out)
    }
}

/// Structural Python type expression for a schema.
///
/// Objects become `{'key': T, ...}`, arrays `list[T]`; the four primitive
/// kinds map to `str`, `float`, `int` and `bool`. Anything else fails.
pub fn python_type(schema: &Schema) -> Result<String, CodegenError> {
    type_expr(schema.as_json())
}

fn type_expr(schema: &Value) -> Result<String, CodegenError> {
    let kind = schema.get("type").and_then(Value::as_str);
    match kind {
        Some("object") => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return Ok("dict[str, Any]".to_string());
            };
            let fields = properties
                .iter()
                .map(|(key, value)| Ok(format!("'{}': {}", py_str(key), type_expr(value)?)))
                .collect::<Result<Vec<_>, CodegenError>>()?;
            Ok(format!("{{{}}}", fields.join(", ")))
        }
        Some("array") => match schema.get("items") {
            Some(items) => Ok(format!("list[{}]", type_expr(items)?)),
            None => Ok("list[Any]".to_string()),
        },
        Some("string") => Ok("str".to_string()),
        Some("number") => Ok("float".to_string()),
        Some("integer") => Ok("int".to_string()),
        Some("boolean") => Ok("bool".to_string()),
        Some(other) => Err(CodegenError::UnsupportedType {
            kind: other.to_string(),
        }),
        None => Err(CodegenError::UnsupportedType {
            kind: schema
                .get("type")
                .map(Value::to_string)
                .unwrap_or_else(|| "undefined".to_string()),
        }),
    }
}

fn write_model(out: &mut String, name: &str, schema: &Schema) -> Result<(), CodegenError> {
    ensure_name(name)?;
    let properties = schema
        .as_json()
        .get("properties")
        .and_then(Value::as_object)
        .filter(|_| schema.kind() == Some("object"));

    match properties {
        Some(props) if props.keys().all(|k| is_name(k)) && !props.is_empty() => {
            write!(out, "\n\nclass {name}(TypedDict):\n")?;
            for (key, value) in props {
                writeln!(out, "    {key}: {}", type_expr(value)?)?;
            }
        }
        Some(props) => {
            let fields = props
                .iter()
                .map(|(key, value)| Ok(format!("'{}': {}", py_str(key), type_expr(value)?)))
                .collect::<Result<Vec<_>, CodegenError>>()?;
            write!(
                out,
                "\n\n{name} = TypedDict('{name}', {{{}}})\n",
                fields.join(", ")
            )?;
        }
        None => {
            write!(out, "\n\n{name} = {}\n", python_type(schema)?)?;
        }
    }
    Ok(())
}

fn write_function(
    out: &mut String,
    function: &FunctionDescription,
    emitted: &HashMap<&str, &Schema>,
) -> Result<(), CodegenError> {
    ensure_name(&function.name)?;
    let input = label(function.input_alias_name.as_deref(), &function.input, emitted)?;
    let output = label(function.output_alias_name.as_deref(), &function.output, emitted)?;
    let summary = function.summary.as_deref().unwrap_or("No summary");
    let description = function.description.as_deref().unwrap_or("No description");

    write!(
        out,
        r#"

def {name}(arg: {input}) -> {output}:
    """
    {summary}

    {description}
    """

    return _execute('{quoted}', arg)
"#,
        name = function.name,
        summary = docstring(summary),
        description = docstring(description),
        quoted = py_str(&function.name),
    )?;
    Ok(())
}

/// Alias name when the alias emitted under that name is this exact type;
/// otherwise the structural expression.
fn label(
    alias: Option<&str>,
    schema: &Schema,
    emitted: &HashMap<&str, &Schema>,
) -> Result<String, CodegenError> {
    match alias {
        Some(name) if emitted.get(name).is_some_and(|s| *s == schema) => Ok(name.to_string()),
        _ => python_type(schema),
    }
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Usable as a bare Python name: an ASCII identifier that is not a keyword.
fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        && !KEYWORDS.contains(&s)
}

fn ensure_name(name: &str) -> Result<(), CodegenError> {
    if is_name(name) {
        Ok(())
    } else {
        Err(CodegenError::InvalidName {
            name: name.to_string(),
        })
    }
}

/// Escape for a single-quoted Python string literal.
fn py_str(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn docstring(s: &str) -> String {
    s.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}
