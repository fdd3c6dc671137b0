#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_reportcardd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn reportcardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

pub fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

pub enum Fx {
    S(&'static str),
    N(f64),
    E,
}

pub fn write_workbook(path: &Path, rows: &[Vec<Fx>]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match cell {
                Fx::S(s) => {
                    sheet
                        .write_string(r as u32, c as u16, *s)
                        .expect("write string cell");
                }
                Fx::N(v) => {
                    sheet
                        .write_number(r as u32, c as u16, *v)
                        .expect("write number cell");
                }
                Fx::E => {}
            }
        }
    }
    workbook.save(path).expect("save workbook");
}

/// Class sheet as exported by the school system: header lines, the anchor
/// row, subject names, a separator line, students and a summary row.
pub fn class_sheet() -> Vec<Vec<Fx>> {
    use Fx::*;
    vec![
        vec![S("Mokykla: Vilniaus 5-oji vidurinė")],
        vec![S("Klasė: IVa"), E, E, S("Mokslo metai 2024-2025")],
        vec![S("Ataskaita 2023-2024")],
        vec![],
        vec![S("Eil. Nr."), S("Pavardė, vardas"), E, E, E, E, E],
        vec![E, E, S("Matematika"), S("Lietuvių kalba"), E, S("Pasiekimų lygis"), S("Dailė")],
        vec![S("-"), S("-"), S("-"), S("-"), E, S("-"), E],
        vec![N(1.0), S("Jonaitis Jonas"), N(9.0), S("8 PR"), S("Patenkinamas"), S("Pagrindinis"), E],
        vec![N(2.0), S("Petraitė/Ona"), S("įsk (IN)"), N(10.0), S("Pagrindinis"), S("Aukštesnysis"), E],
        vec![N(3.0), S("Kazlauskas \"Tomas\""), S("PR"), N(7.0), E, S("Slenkstinis"), E],
        vec![E, S("KLASES PAZANGUMAS"), N(8.7), N(8.3), E, E, S("95%")],
    ]
}
