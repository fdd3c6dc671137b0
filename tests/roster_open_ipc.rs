mod test_support;

use serde_json::json;
use std::io::{BufRead, Write};
use test_support::{class_sheet, error_code, request, request_ok, spawn_sidecar, temp_dir, write_workbook, Fx};

#[test]
fn open_reports_metadata_and_columns() {
    let dir = temp_dir("reportcardd-open");
    let xlsx = dir.join("klase.xlsx");
    write_workbook(&xlsx, &class_sheet());

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["rosterPath"], json!(null));

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.open",
        json!({ "path": xlsx.to_string_lossy() }),
    );
    assert_eq!(
        opened["metadata"],
        json!({
            "institution": "Vilniaus 5-oji vidurinė",
            "classLabel": "IVa",
            "academicYear": "2024–2025"
        })
    );
    assert_eq!(opened["headerRow"], json!(4));
    assert_eq!(opened["subjectsRow"], json!(5));
    assert_eq!(
        opened["columns"],
        json!(["Eil. Nr.", "Pavardė, vardas", "Matematika", "Lietuvių kalba", "Subject_3"])
    );
    assert_eq!(opened["limits"]["headerScanRows"], json!(40));

    let health = request_ok(&mut stdin, &mut reader, "3", "health", json!({}));
    assert_eq!(health["rosterPath"], json!(xlsx.to_string_lossy()));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn preview_shows_first_rows_as_text() {
    let dir = temp_dir("reportcardd-preview");
    let xlsx = dir.join("klase.xlsx");
    write_workbook(&xlsx, &class_sheet());

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let before = request(&mut stdin, &mut reader, "1", "roster.preview", json!({}));
    assert_eq!(error_code(&before), Some("no_roster"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.open",
        json!({ "path": xlsx.to_string_lossy() }),
    );
    let preview = request_ok(&mut stdin, &mut reader, "3", "roster.preview", json!({ "limit": 2 }));
    assert_eq!(preview["studentCount"], json!(3));
    assert_eq!(
        preview["rows"],
        json!([
            ["1", "Jonaitis Jonas", "9", "8 PR", "Patenkinamas"],
            ["2", "Petraitė/Ona", "įsk (IN)", "10", "Pagrindinis"]
        ])
    );

    let bad = request(&mut stdin, &mut reader, "4", "roster.preview", json!({ "limit": "all" }));
    assert_eq!(error_code(&bad), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn header_below_scan_limit_needs_wider_limits() {
    let dir = temp_dir("reportcardd-limits");
    let xlsx = dir.join("gilu.xlsx");
    let mut rows: Vec<Vec<Fx>> = (0..45).map(|_| vec![Fx::S("pastaba")]).collect();
    rows.push(vec![Fx::S("Eil. Nr."), Fx::S("Pavardė, vardas")]);
    rows.push(vec![Fx::E, Fx::E, Fx::S("Fizika")]);
    rows.push(vec![Fx::N(1.0), Fx::S("Jonaitis Jonas"), Fx::N(9.0)]);
    write_workbook(&xlsx, &rows);

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let narrow = request(
        &mut stdin,
        &mut reader,
        "1",
        "roster.open",
        json!({ "path": xlsx.to_string_lossy() }),
    );
    assert_eq!(error_code(&narrow), Some("structure_error"));

    let wide = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.open",
        json!({ "path": xlsx.to_string_lossy(), "limits": { "headerScanRows": 60 } }),
    );
    assert_eq!(wide["headerRow"], json!(45));
    assert_eq!(wide["studentCount"], json!(1));

    let bad = request(
        &mut stdin,
        &mut reader,
        "3",
        "roster.open",
        json!({ "path": xlsx.to_string_lossy(), "limits": { "headerScanRows": -1 } }),
    );
    assert_eq!(error_code(&bad), Some("bad_params"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn unreadable_inputs_are_reported() {
    let dir = temp_dir("reportcardd-unreadable");
    let not_xlsx = dir.join("tekstas.xlsx");
    std::fs::write(&not_xlsx, b"not a workbook").expect("write file");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "roster.open",
        json!({ "path": not_xlsx.to_string_lossy() }),
    );
    assert_eq!(error_code(&resp), Some("read_failed"));

    let resp = request(&mut stdin, &mut reader, "2", "roster.open", json!({}));
    assert_eq!(error_code(&resp), Some("bad_params"));

    let resp = request(&mut stdin, &mut reader, "3", "roster.delete", json!({}));
    assert_eq!(error_code(&resp), Some("not_implemented"));

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(error_code(&value), Some("bad_json"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn row_indexes_are_sheet_positions() {
    let dir = temp_dir("reportcardd-origin");
    let xlsx = dir.join("paslinkta.xlsx");
    use Fx::*;
    write_workbook(
        &xlsx,
        &[
            vec![],
            vec![],
            vec![],
            vec![E, S("Mokykla: Kauno gimnazija")],
            vec![E, S("Eil. Nr."), S("Pavardė, vardas")],
            vec![E, E, E, S("Fizika")],
            vec![E, N(1.0), S("Jonaitis Jonas"), N(9.0)],
        ],
    );

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "roster.open",
        json!({ "path": xlsx.to_string_lossy() }),
    );
    assert_eq!(opened["origin"], json!({ "row": 3, "col": 1 }));
    assert_eq!(opened["headerRow"], json!(4));
    assert_eq!(opened["subjectsRow"], json!(5));
    assert_eq!(opened["metadata"]["institution"], json!("Kauno gimnazija"));
    assert_eq!(opened["subjects"], json!(["Fizika"]));
    assert_eq!(opened["studentCount"], json!(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(dir);
}
