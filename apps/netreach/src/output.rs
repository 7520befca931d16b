use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes pretty JSON to `path`, or to stdout when no path is given.
pub fn emit_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    match path {
        Some(path) => write_json(path, value),
        None => {
            let json = serde_json::to_string_pretty(value)?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
            Ok(())
        }
    }
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    atomic_write(path, &json)
}

/// Replaces `path` with `data` through a sibling temp file so readers never
/// see a partial report. The directory entry is synced after the rename.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {dir:?}"))?;

    let staged = temp_path(path);
    if let Err(err) = stage(&staged, data) {
        let _ = fs::remove_file(&staged);
        return Err(err);
    }
    if let Err(err) = fs::rename(&staged, path) {
        let _ = fs::remove_file(&staged);
        return Err(anyhow!("failed to replace output {:?}: {}", path, err));
    }

    sync_dir(dir);
    Ok(())
}

fn stage(staged: &Path, data: &[u8]) -> Result<()> {
    let mut file =
        fs::File::create(staged).with_context(|| format!("creating temp file {staged:?}"))?;
    file.write_all(data)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("writing temp file {staged:?}"))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    match fs::File::open(dir) {
        Ok(handle) => {
            if let Err(err) = handle.sync_all() {
                log::debug!("directory sync of {dir:?} failed: {err}");
            }
        }
        Err(err) => log::debug!("cannot open {dir:?} for sync: {err}"),
    }
}

// Directory handles cannot be opened for sync on Windows; rename is durable there.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("report.json");
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.part-{}-{nanos}", std::process::id()))
}

/// Reads one target per line; blank lines and `#` comments are ignored.
pub fn read_targets(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .map_err(|err| anyhow!("failed to read targets file {:?}: {}", path, err))?;
    Ok(parse_targets(&contents))
}

fn parse_targets(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_file_skips_comments() {
        let targets = parse_targets("# lab\n8.8.8.8\n\n  example.com  \n#1.1.1.1\n");
        assert_eq!(targets, vec!["8.8.8.8", "example.com"]);
    }

    #[test]
    fn temp_path_is_hidden_sibling() {
        let tmp = temp_path(Path::new("out/report.json"));
        assert_eq!(tmp.parent(), Some(Path::new("out")));
        let name = tmp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".report.json.part-"));
    }

    #[test]
    fn write_json_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");

        write_json(&path, &serde_json::json!({"target": "first"})).unwrap();
        write_json(&path, &serde_json::json!({"target": "second"})).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["target"], "second");

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".part-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn temp_path_for_bare_file_name_stays_relative() {
        let tmp = temp_path(Path::new("report.json"));
        assert_eq!(tmp.parent(), Some(Path::new("")));
        assert!(tmp.to_str().unwrap().starts_with(".report.json.part-"));
    }
}
