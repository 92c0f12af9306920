//! Backend identification.

use std::fmt;
use std::str::FromStr;

/// Identifies the storage engine a filter is translated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// MongoDB (document store).
    MongoDB,
    /// SQLite database (file-based or in-memory).
    Sqlite,
    /// PostgreSQL database.
    Postgres,
    /// Elasticsearch (search engine).
    Elasticsearch,
}

impl BackendKind {
    /// The built-in backends.
    pub fn all() -> &'static [BackendKind] {
        &[
            BackendKind::MongoDB,
            BackendKind::Sqlite,
            BackendKind::Postgres,
            BackendKind::Elasticsearch,
        ]
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::MongoDB => write!(f, "mongodb"),
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Postgres => write!(f, "postgres"),
            BackendKind::Elasticsearch => write!(f, "elasticsearch"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(BackendKind::MongoDB),
            "sqlite" => Ok(BackendKind::Sqlite),
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "elasticsearch" | "es" => Ok(BackendKind::Elasticsearch),
            other => Err(format!(
                "unknown backend '{}' (expected one of: mongodb, sqlite, postgres, elasticsearch)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_round_trip() {
        for kind in BackendKind::all() {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), *kind);
        }
        assert_eq!("PostgreSQL".parse::<BackendKind>().unwrap(), BackendKind::Postgres);
        assert!("oracle".parse::<BackendKind>().is_err());
    }
}
