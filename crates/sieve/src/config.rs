//! Command line configuration.
//!
//! Every option can also be set through an environment variable.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SIEVE_BACKEND` | mongodb | Target backend (mongodb, sqlite, postgres, elasticsearch) |
//! | `SIEVE_SCHEMA` | - | Path to a JSON schema of the filtered type |
//! | `SIEVE_RULES` | - | Path to a JSON list of field acceptance rules |
//! | `SIEVE_MAX_DEPTH` | 64 | Maximum nesting depth |
//! | `SIEVE_MAX_TOKENS` | 1024 | Maximum token count |
//! | `SIEVE_PATH_SEPARATOR` | _ | Joins nested paths into SQL column names |
//! | `SIEVE_PARAM_OFFSET` | 0 | Number of SQL parameters already bound |
//! | `SIEVE_LOG_LEVEL` | warn | Log level |

use std::path::PathBuf;

use clap::Parser;
use sieve_filter::token::TokenKind;
use sieve_filter::{Literal, ParseOptions, tokenize};
use sieve_persistence::backends::relational::DEFAULT_PATH_SEPARATOR;
use sieve_persistence::{BackendKind, TranslationContext};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Options of the `sieve` command.
#[derive(Debug, Clone, Parser)]
#[command(name = "sieve")]
#[command(about = "Translate a filter expression into a native backend filter")]
pub struct CliConfig {
    /// Filter expression, e.g. "status = 'active' and age >= 18".
    pub filter: String,

    /// Target backend.
    #[arg(short, long, env = "SIEVE_BACKEND", default_value = "mongodb")]
    pub backend: String,

    /// JSON schema of the filtered type. Without one every field is accepted untyped.
    #[arg(long, env = "SIEVE_SCHEMA")]
    pub schema: Option<PathBuf>,

    /// JSON list of field acceptance rules. Without one every field and operator is accepted.
    #[arg(long, env = "SIEVE_RULES")]
    pub rules: Option<PathBuf>,

    /// External constant as NAME=VALUE; may be repeated.
    #[arg(short = 'e', long = "external", value_name = "NAME=VALUE")]
    pub externals: Vec<String>,

    /// Maximum nesting of parentheses, `not` and unary minus.
    #[arg(long, env = "SIEVE_MAX_DEPTH", default_value = "64")]
    pub max_depth: usize,

    /// Maximum number of tokens in the filter.
    #[arg(long, env = "SIEVE_MAX_TOKENS", default_value = "1024")]
    pub max_tokens: usize,

    /// Separator used to flatten nested paths into SQL column names.
    #[arg(long, env = "SIEVE_PATH_SEPARATOR", default_value = DEFAULT_PATH_SEPARATOR)]
    pub path_separator: String,

    /// Number of SQL parameters already bound by the surrounding statement.
    #[arg(long, env = "SIEVE_PARAM_OFFSET", default_value = "0")]
    pub param_offset: usize,

    /// Pretty-print JSON output.
    #[arg(long)]
    pub pretty: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "SIEVE_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        let options = ParseOptions::default();
        Self {
            filter: String::new(),
            backend: "mongodb".to_string(),
            schema: None,
            rules: None,
            externals: Vec::new(),
            max_depth: options.max_depth,
            max_tokens: options.max_tokens,
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
            param_offset: 0,
            pretty: false,
            log_level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Parser limits.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::default()
            .with_max_depth(self.max_depth)
            .with_max_tokens(self.max_tokens)
    }

    /// The selected backend.
    pub fn backend_kind(&self) -> Result<BackendKind, String> {
        self.backend.parse()
    }

    /// Builds the external constants from the `--external` options.
    pub fn translation_context(&self) -> Result<TranslationContext, String> {
        let mut ctx = TranslationContext::new();
        for entry in &self.externals {
            let (name, value) = entry
                .split_once('=')
                .ok_or_else(|| format!("External '{}' must have the form NAME=VALUE", entry))?;
            let name = name.trim().trim_start_matches('@');
            if name.is_empty() {
                return Err(format!("External '{}' has an empty name", entry));
            }
            ctx.insert(name, external_value(value));
        }
        Ok(ctx)
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.filter.trim().is_empty() {
            errors.push("Filter cannot be empty".to_string());
        }

        if let Err(e) = self.backend_kind() {
            errors.push(e);
        }

        if self.max_depth == 0 {
            errors.push("Max depth cannot be 0".to_string());
        }

        if self.max_tokens == 0 {
            errors.push("Max tokens cannot be 0".to_string());
        }

        if self.path_separator.is_empty() {
            errors.push("Path separator cannot be empty".to_string());
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "Unknown log level '{}' (expected one of: {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        if let Err(e) = self.translation_context() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A value that reads as exactly one literal token is taken as that literal;
/// anything else is a string.
fn external_value(text: &str) -> Literal {
    match tokenize(text.trim()).as_deref() {
        Ok([token]) => match &token.kind {
            TokenKind::Literal(literal) => literal.clone(),
            _ => Literal::String(text.to_string()),
        },
        _ => Literal::String(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_filter::ExternalConstant;

    fn resolve(ctx: &TranslationContext, name: &str) -> Literal {
        ctx.resolve(&ExternalConstant {
            name: name.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.backend_kind().unwrap(), BackendKind::MongoDB);
        assert_eq!(config.parse_options(), ParseOptions::default());
        assert_eq!(config.path_separator, "_");
    }

    #[test]
    fn test_parse_arguments() {
        let config = CliConfig::try_parse_from([
            "sieve",
            "--backend",
            "postgres",
            "--max-depth",
            "8",
            "-e",
            "limit=10",
            "age < @limit",
        ])
        .unwrap();
        assert_eq!(config.filter, "age < @limit");
        assert_eq!(config.backend_kind().unwrap(), BackendKind::Postgres);
        assert_eq!(config.parse_options().max_depth, 8);
        assert_eq!(config.externals, vec!["limit=10".to_string()]);
    }

    #[test]
    fn test_validate_valid() {
        let config = CliConfig {
            filter: "a = 1".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_every_problem() {
        let config = CliConfig {
            filter: " ".to_string(),
            backend: "oracle".to_string(),
            max_depth: 0,
            log_level: "loud".to_string(),
            externals: vec!["novalue".to_string()],
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.iter().any(|e| e.contains("Filter")));
        assert!(errors.iter().any(|e| e.contains("oracle")));
        assert!(errors.iter().any(|e| e.contains("NAME=VALUE")));
    }

    #[test]
    fn test_external_values() {
        let config = CliConfig {
            externals: vec![
                "limit=10".to_string(),
                "@ratio=-0.5".to_string(),
                "flag=true".to_string(),
                "since=2024-01-01".to_string(),
                "name='Ada'".to_string(),
                "plain=hello world".to_string(),
            ],
            ..Default::default()
        };
        let ctx = config.translation_context().unwrap();
        assert_eq!(ctx.len(), 6);
        assert_eq!(resolve(&ctx, "limit"), Literal::from(10i64));
        assert_eq!(resolve(&ctx, "ratio"), Literal::from(-0.5));
        assert_eq!(resolve(&ctx, "flag"), Literal::Boolean(true));
        assert_eq!(resolve(&ctx, "since").kind(), sieve_filter::LiteralKind::Date);
        assert_eq!(resolve(&ctx, "name"), Literal::String("Ada".to_string()));
        assert_eq!(resolve(&ctx, "plain"), Literal::String("hello world".to_string()));
    }
}
