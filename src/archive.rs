use anyhow::Context;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const FALLBACK_STEM: &str = "mokinys";

#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub entry_count: usize,
    pub entry_names: Vec<String>,
    pub sha256: String,
}

/// Replaces the nine characters that are unsafe in file names on common filesystems.
pub fn safe_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '/' | '\\' | ':' | '*' | '|' => out.push('-'),
            '?' | '"' => {}
            '<' => out.push('('),
            '>' => out.push(')'),
            c => out.push(c),
        }
    }
    let out = out.trim().to_string();
    if out.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        out
    }
}

/// `<safe name>.<ext>` per student; repeated names get ` (2)`, ` (3)` suffixes.
pub fn entry_names<'a, I>(student_names: I, extension: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for name in student_names {
        let stem = safe_file_name(name);
        let mut candidate = format!("{stem}.{extension}");
        let mut n = 2;
        while !seen.insert(candidate.to_lowercase()) {
            candidate = format!("{stem} ({n}).{extension}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// Writes a deflated zip of `(entry name, bytes)` pairs.
///
/// The archive is assembled next to `out_path` and renamed into place only
/// after it is complete, so a failed run never leaves a partial archive.
pub fn write_archive(out_path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<ArchiveSummary> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
    }

    let mut tmp_name = out_path.as_os_str().to_owned();
    tmp_name.push(".partial");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    let result = write_zip(&tmp_path, entries);
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result?;

    if out_path.exists() {
        std::fs::remove_file(out_path).with_context(|| {
            format!("failed to replace existing archive {}", out_path.to_string_lossy())
        })?;
    }
    std::fs::rename(&tmp_path, out_path).with_context(|| {
        format!("failed to move archive to {}", out_path.to_string_lossy())
    })?;

    let bytes = std::fs::read(out_path)
        .with_context(|| format!("failed to read back {}", out_path.to_string_lossy()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);

    Ok(ArchiveSummary {
        entry_count: entries.len(),
        entry_names: entries.iter().map(|(name, _)| name.to_string()).collect(),
        sha256: format!("{:x}", hasher.finalize()),
    })
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
    let out_file = File::create(path)
        .with_context(|| format!("failed to create archive {}", path.to_string_lossy()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        zip.start_file(*name, opts)
            .with_context(|| format!("failed to start entry {}", name))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write entry {}", name))?;
    }
    zip.finish().context("failed to finalize zip archive")?;
    Ok(())
}
