//! JSON result envelopes.
//!
//! Success: `{"ok":true,"data":<result>}`. Failure:
//! `{"ok":false,"error":{"code":"...","message":"..."}}`. In `serve` mode
//! the caller's `id` is echoed first when present.

use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;

use crate::error::ToolError;
use crate::service::ToolOutput;

const FALLBACK_FAILURE: &str =
    r#"{"ok":false,"error":{"code":"internal.serialization","message":"failed to render error"}}"#;

#[derive(Debug, Serialize)]
struct Success<'a, D: Serialize + ?Sized> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a Value>,
    ok: bool,
    data: &'a D,
}

#[derive(Debug, Serialize)]
struct Failure<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a Value>,
    ok: bool,
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Render a success envelope. The compact form embeds the result bytes as
/// they were cached; the pretty form re-indents them.
pub fn success(id: Option<&Value>, output: &ToolOutput, pretty: bool) -> Result<String, ToolError> {
    if pretty {
        let data: Value = serde_json::from_str(&output.json)?;
        return Ok(serde_json::to_string_pretty(&Success {
            id,
            ok: true,
            data: &data,
        })?);
    }

    let data = RawValue::from_string(output.json.clone())?;
    Ok(serde_json::to_string(&Success {
        id,
        ok: true,
        data: &*data,
    })?)
}

pub fn failure(id: Option<&Value>, error: &ToolError, pretty: bool) -> String {
    let envelope = Failure {
        id,
        ok: false,
        error: ErrorBody {
            code: error.code(),
            message: error.to_string(),
        },
    };

    let rendered = if pretty {
        serde_json::to_string_pretty(&envelope)
    } else {
        serde_json::to_string(&envelope)
    };
    rendered.unwrap_or_else(|_| String::from(FALLBACK_FAILURE))
}
