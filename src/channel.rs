//! JSON-lines method channel over stdin/stdout.
//!
//! Requests:  `{"id": 1, "method": "getApp", "arguments": {...}}`
//! Responses: `{"id": 1, "result": ...}`, `{"id": 1, "error": {"code", "message"}}`
//! or `{"id": 1, "not_implemented": true}`.

use crossbeam_channel::{Receiver, unbounded};
use devapps_core::{MethodCall, MethodResponse};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, Write};

pub const BAD_REQUEST_CODE: &str = "BAD_REQUEST";

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(flatten)]
    pub body: ResponseBody,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseBody {
    Result(Value),
    Error(ErrorBody),
    NotImplemented(bool),
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl Response {
    pub fn new(id: Value, response: MethodResponse) -> Self {
        let body = match response {
            MethodResponse::Success(value) => ResponseBody::Result(value),
            MethodResponse::Error { code, message } => ResponseBody::Error(ErrorBody { code, message }),
            MethodResponse::NotImplemented => ResponseBody::NotImplemented(true),
        };
        Self { id, body }
    }

    fn bad_request(id: Value, message: String) -> Self {
        Self {
            id,
            body: ResponseBody::Error(ErrorBody {
                code: BAD_REQUEST_CODE.to_string(),
                message,
            }),
        }
    }
}

/// Decode one request line into its id and call.
///
/// Undecodable lines produce the error response to send back instead. The id
/// is salvaged when the line is at least a JSON object.
pub fn decode(line: &str) -> Result<(Value, MethodCall), Response> {
    match serde_json::from_str::<Request>(line) {
        Ok(request) => Ok((request.id, MethodCall::new(request.method, request.arguments))),
        Err(e) => {
            let id = serde_json::from_str::<Value>(line)
                .ok()
                .and_then(|v| v.get("id").cloned())
                .unwrap_or(Value::Null);
            Err(Response::bad_request(id, format!("Malformed request: {e}")))
        }
    }
}

/// Write one response line to stdout.
pub fn send(response: &Response) {
    let line = match serde_json::to_string(response) {
        Ok(line) => line,
        Err(e) => {
            error!("Failed to encode response {}: {}", response.id, e);
            return;
        }
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{line}").and_then(|_| stdout.flush()) {
        error!("Failed to write response: {}", e);
    }
}

/// Read stdin on a background thread, one non-empty line per message.
///
/// The receiver disconnects at EOF or on a read error.
pub fn spawn_reader() -> std::io::Result<Receiver<String>> {
    let (tx, rx) = unbounded();

    std::thread::Builder::new()
        .name("devapps-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) if line.trim().is_empty() => continue,
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to read request: {}", e);
                        break;
                    }
                }
            }
            debug!("stdin closed");
        })?;

    Ok(rx)
}
