use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::io::{self, Write};

#[derive(Serialize)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

pub fn envelope<T: Serialize>(op: &str, apply: bool, body: &T, meta: Option<Meta>) -> serde_json::Value {
    let key = if apply { "result" } else { "plan" };
    json!({ "op": op, "apply": apply, key: body, "meta": meta })
}

pub fn print_plan<T: Serialize>(op: &str, plan: &T, meta: Option<Meta>) -> Result<()> {
    write_line(&envelope(op, false, plan, meta))
}

pub fn print_result<T: Serialize>(op: &str, result: &T, meta: Option<Meta>) -> Result<()> {
    write_line(&envelope(op, true, result, meta))
}

fn write_line(env: &serde_json::Value) -> Result<()> {
    let mut out = io::stdout();
    serde_json::to_writer(&mut out, env)?;
    writeln!(&mut out)?;
    Ok(())
}
