//! Built‑ins installed into every interpreter's global environment.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Local;
use log::{debug, info};

use crate::interpreter::Interpreter;
use crate::value::{NativeFunction, Value};

/// Every built‑in, in definition order.
pub fn builtins() -> Vec<NativeFunction> {
    vec![
        NativeFunction {
            name: "clock",
            arity: 0,
            func: clock,
        },
        NativeFunction {
            name: "time",
            arity: 0,
            func: time,
        },
        NativeFunction {
            name: "date",
            arity: 0,
            func: date,
        },
        NativeFunction {
            name: "exit",
            arity: 0,
            func: exit,
        },
    ]
}

/// Seconds since the Unix epoch.
fn clock(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?
        .as_secs_f64();

    debug!("clock() -> {}", timestamp);

    Ok(Value::Number(timestamp))
}

/// Local wall‑clock time, `H:M:S` without padding.
fn time(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    Ok(Value::String(Local::now().format("%-H:%-M:%-S").to_string()))
}

/// Local date, `Y/M/D` without padding.
fn date(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    Ok(Value::String(Local::now().format("%Y/%-m/%-d").to_string()))
}

fn exit(_: &mut Interpreter, _: &[Value]) -> Result<Value, String> {
    info!("exit() called, terminating");

    std::process::exit(0)
}
