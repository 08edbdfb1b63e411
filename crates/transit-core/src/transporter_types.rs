use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Transporter backend types
///
/// Defined in core because configuration selects a backend before the storage
/// crate builds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransporterBackend {
    S3,
    Local,
}

impl FromStr for TransporterBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3" => Ok(TransporterBackend::S3),
            "local" => Ok(TransporterBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid transporter backend: {}", s)),
        }
    }
}

impl Display for TransporterBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TransporterBackend::S3 => write!(f, "s3"),
            TransporterBackend::Local => write!(f, "local"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!("S3".parse::<TransporterBackend>().unwrap(), TransporterBackend::S3);
        assert_eq!(
            " local ".parse::<TransporterBackend>().unwrap(),
            TransporterBackend::Local
        );
        assert!("nfs".parse::<TransporterBackend>().is_err());
        assert_eq!(TransporterBackend::Local.to_string(), "local");
    }
}
