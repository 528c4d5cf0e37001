//! File-level checks: size, extension, encoding.

use super::{CheckConfig, CheckResult, CheckStatus, FileMeta, Severity};

/// Run the file-level rule set in its fixed order.
pub fn run_file_checks(meta: &FileMeta, config: &CheckConfig) -> Vec<CheckResult> {
    vec![
        check_file_size(meta, config),
        check_file_type(meta, config),
        check_encoding(meta),
    ]
}

fn check_file_size(meta: &FileMeta, config: &CheckConfig) -> CheckResult {
    if meta.byte_len > config.max_file_bytes {
        CheckResult::failing(
            "file-size",
            "File size",
            CheckStatus::Fail,
            Severity::Critical,
            format!(
                "File is {} bytes, exceeding the {} byte limit",
                meta.byte_len, config.max_file_bytes
            ),
        )
        .with_details(format!(
            "byte_len={} max={}",
            meta.byte_len, config.max_file_bytes
        ))
    } else {
        CheckResult::pass(
            "file-size",
            "File size",
            Severity::Critical,
            "File size is within the configured limit",
        )
    }
}

fn check_file_type(meta: &FileMeta, config: &CheckConfig) -> CheckResult {
    let extension = meta
        .file_name
        .rsplit('.')
        .next()
        .filter(|ext| *ext != meta.file_name)
        .map(str::to_lowercase)
        .unwrap_or_default();

    if config.allowed_extensions.iter().any(|e| *e == extension) {
        CheckResult::pass(
            "file-type",
            "File type",
            Severity::Critical,
            "File extension is supported",
        )
    } else {
        CheckResult::failing(
            "file-type",
            "File type",
            CheckStatus::Fail,
            Severity::Critical,
            format!(
                "Unsupported file type '.{extension}'; expected one of: {}",
                config
                    .allowed_extensions
                    .iter()
                    .map(|e| format!(".{e}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
        .with_details(format!("file_name={}", meta.file_name))
    }
}

fn check_encoding(meta: &FileMeta) -> CheckResult {
    match std::str::from_utf8(&meta.sample) {
        Ok(_) => CheckResult::pass(
            "encoding",
            "Encoding",
            Severity::High,
            "Sample decodes as UTF-8",
        ),
        Err(e) => CheckResult::failing(
            "encoding",
            "Encoding",
            CheckStatus::Fail,
            Severity::High,
            "File sample is not valid UTF-8".to_string(),
        )
        .with_details(format!("decode error at byte {}", e.valid_up_to())),
    }
}
