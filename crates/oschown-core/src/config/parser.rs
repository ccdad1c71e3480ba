//! TOML parser with helpful error messages

use super::schema::OschownConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse oschown.toml with detailed error messages
pub fn parse_oschown_toml(path: &Path) -> Result<OschownConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_oschown_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse oschown.toml content from string
pub fn parse_oschown_toml_str(content: &str) -> Result<OschownConfig> {
    let config: OschownConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Attach the offending lines to a TOML error when a position is known
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();

    let line_num = error.span().map(|span| {
        let before = content.get(..span.start).unwrap_or(content);
        before.matches('\n').count() + 1
    });

    match line_num {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            message
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
state_dir = "/var/lib/oschown"

[nova]
state_file = "/srv/nova.json"

[cinder]
transfer_name = "moving-day"

[neutron]
enabled = false

[identity.users]
alice = "u-123"

[identity.projects]
demo = "p-456"
"#;

        let config = parse_oschown_toml_str(toml).unwrap();
        assert_eq!(config.state_dir, Some(PathBuf::from("/var/lib/oschown")));
        assert_eq!(config.nova.state_file, Some(PathBuf::from("/srv/nova.json")));
        assert_eq!(config.cinder.transfer_name, "moving-day");
        assert!(!config.neutron.enabled);
        assert_eq!(config.identity.users["alice"], "u-123");
        assert_eq!(config.identity.projects["demo"], "p-456");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_oschown_toml_str("").unwrap();
        assert_eq!(config, OschownConfig::default());
    }

    #[test]
    fn test_parse_invalid_toml_reports_line() {
        let toml = "[nova]\nenabled = true\n[cinder\ntransfer_name = \"x\"\n";

        let err = parse_oschown_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("TOML parsing error"));
        assert!(err.contains("line 3"));
        assert!(err.contains(">>>"));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let toml = r#"
[cinder]
transfer_name = ""
"#;

        let err = parse_oschown_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("transfer_name"));
    }

    #[test]
    fn test_parse_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[nova]\nenabled = false").unwrap();

        let config = parse_oschown_toml(temp_file.path()).unwrap();
        assert!(!config.nova.enabled);
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = parse_oschown_toml(Path::new("/nonexistent/path/oschown.toml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
