use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use annosync::RunReport;

pub fn write_report(path: &Path, report: &RunReport) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            format!(
                "Failed to create report directory '{}': {err}",
                parent.display()
            )
        })?;
    }

    let mut file = File::create(path)
        .map_err(|err| format!("Failed to create run report '{}': {err}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, report)
        .map_err(|err| format!("Failed to serialize run report '{}': {err}", path.display()))?;
    file.write_all(b"\n")
        .map_err(|err| format!("Failed to finalize run report '{}': {err}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use annosync::OutputMode;

    #[test]
    fn writes_pretty_json_with_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("run.json");
        let report =
            RunReport::new(OutputMode::Compact, Vec::new()).with_generated_at("2026-01-01T00:00:00Z");

        write_report(&path, &report).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["schema_version"], 1);
        assert_eq!(parsed["meta"]["generated_at"], "2026-01-01T00:00:00Z");
        assert_eq!(parsed["summary"]["total"], 0);
    }
}
