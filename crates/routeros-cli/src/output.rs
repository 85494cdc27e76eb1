//! Response formatting

use routeros_client::{Response, ResponseType};
use serde_json::{Map, Value, json};

use crate::cli::OutputFormat;
use crate::error::CliResult;

/// Renders one response as a line of text.
///
/// Data responses list their attributes; other types are prefixed with the
/// reply word so errors stand out.
pub fn text_line(response: &Response) -> String {
    let mut line = match response.response_type() {
        ResponseType::Data => String::new(),
        other => other.to_string(),
    };
    for (name, value) in response.arguments() {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(name);
        line.push('=');
        line.push_str(&value.as_text());
    }
    for word in response.unrecognized_words() {
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&String::from_utf8_lossy(word));
    }
    line
}

/// Converts one response to JSON.
pub fn to_json(response: &Response) -> Value {
    let attributes: Map<String, Value> = response
        .arguments()
        .map(|(name, value)| (name.to_string(), Value::String(value.as_text().into_owned())))
        .collect();
    let mut value = json!({
        "type": response.response_type().as_word(),
        "attributes": attributes,
    });
    if !response.tag().is_empty() {
        value["tag"] = Value::String(response.tag().to_string());
    }
    let extra: Vec<Value> = response
        .unrecognized_words()
        .iter()
        .map(|w| Value::String(String::from_utf8_lossy(w).into_owned()))
        .collect();
    if !extra.is_empty() {
        value["words"] = Value::Array(extra);
    }
    value
}

/// Renders a complete set of responses.
///
/// Final responses without attributes carry no information in text form and
/// are left out.
pub fn render(responses: &[Response], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => {
            let all: Vec<Value> = responses.iter().map(to_json).collect();
            Ok(serde_json::to_string_pretty(&all)?)
        }
        OutputFormat::Text => Ok(responses
            .iter()
            .filter(|r| r.response_type() != ResponseType::Final || r.arguments().next().is_some())
            .map(text_line)
            .collect::<Vec<_>>()
            .join("\n")),
    }
}
