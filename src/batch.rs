//! Directory conversion.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::diagnostics::Warning;
use crate::engine::Converter;
use crate::error::{SqlPortError, SqlPortResult};

/// Script extensions picked up by [`convert_dir`].
pub const SCRIPT_EXTENSIONS: [&str; 2] = ["sql", "hql"];

/// Outcome of converting one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub success: bool,
    pub statements: usize,
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    /// One entry per input file, in sorted path order.
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.success).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    pub fn warning_count(&self) -> usize {
        self.files.iter().map(|f| f.warnings.len()).sum()
    }

    pub fn to_json(&self) -> SqlPortResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Convert every script in `input` and write `<name>.sql` files to `output`.
///
/// Files are converted in parallel. A file that fails to convert gets an
/// error entry in the report and no output file; the batch carries on.
pub fn convert_dir(
    input: &Path,
    output: &Path,
    converter: &Converter,
) -> SqlPortResult<BatchReport> {
    if !input.is_dir() {
        return Err(SqlPortError::InvalidInput(format!(
            "{} is not a directory",
            input.display()
        )));
    }
    let scripts = list_scripts(input)?;
    fs::create_dir_all(output)?;

    let files = scripts
        .par_iter()
        .map(|path| convert_file(path, output, converter))
        .collect();

    Ok(BatchReport {
        generated_at: Utc::now(),
        files,
    })
}

fn list_scripts(dir: &Path) -> SqlPortResult<Vec<PathBuf>> {
    let mut scripts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_script = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SCRIPT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if path.is_file() && is_script {
            scripts.push(path);
        }
    }
    scripts.sort();
    Ok(scripts)
}

fn convert_file(path: &Path, output: &Path, converter: &Converter) -> FileReport {
    match try_convert_file(path, output, converter) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "conversion failed");
            FileReport {
                path: path.to_path_buf(),
                success: false,
                statements: 0,
                warnings: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

fn try_convert_file(
    path: &Path,
    output: &Path,
    converter: &Converter,
) -> SqlPortResult<FileReport> {
    let script = fs::read_to_string(path)?;
    let result = converter.convert(&script)?;

    let name = path
        .file_stem()
        .ok_or_else(|| SqlPortError::InvalidInput(format!("no file name in {}", path.display())))?;
    let target = output.join(format!("{}.sql", name.to_string_lossy()));
    fs::write(&target, format!("{}\n", result.text))?;

    tracing::info!(
        path = %path.display(),
        statements = result.statements,
        warnings = result.warnings.len(),
        "converted"
    );

    Ok(FileReport {
        path: path.to_path_buf(),
        success: result.success,
        statements: result.statements,
        warnings: result.warnings,
        error: None,
    })
}
