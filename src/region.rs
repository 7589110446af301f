use std::fmt;

use crate::{AwsError, Result};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

const REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-north-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-south-1",
    "sa-east-1",
];

/// Services with a JSON-protocol endpoint in every region.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Service {
    Kinesis,
    DynamoDb,
}

impl Service {
    /// Endpoint prefix, also the signing service name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Kinesis => "kinesis",
            Self::DynamoDb => "dynamodb",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A commercial AWS region.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Region {
    name: &'static str,
}

impl Region {
    pub fn lookup(name: &str) -> Option<Self> {
        REGIONS
            .iter()
            .copied()
            .find(|region| region.eq_ignore_ascii_case(name.trim()))
            .map(|name| Self { name })
    }

    /// Like [`Region::lookup`], reporting unknown names as configuration errors.
    pub fn require(name: &str) -> Result<Self> {
        Self::lookup(name).ok_or_else(|| {
            AwsError::Configuration(format!("no endpoints known for region '{name}'"))
        })
    }

    pub fn all() -> impl Iterator<Item = Self> {
        REGIONS.iter().copied().map(|name| Self { name })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// `https://{service}.{region}.amazonaws.com`
    pub fn endpoint(&self, service: Service) -> String {
        format!("https://{}.{}.amazonaws.com", service.name(), self.name)
    }
}

impl Default for Region {
    fn default() -> Self {
        Self {
            name: DEFAULT_REGION,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Region, Service};
    use crate::AwsError;

    #[test]
    fn default_region_endpoints() {
        let region = Region::default();
        assert_eq!(region.name(), "us-east-1");
        assert_eq!(
            region.endpoint(Service::Kinesis),
            "https://kinesis.us-east-1.amazonaws.com"
        );
        assert_eq!(
            region.endpoint(Service::DynamoDb),
            "https://dynamodb.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(Region::lookup("EU-West-1").unwrap().name(), "eu-west-1");
    }

    #[test]
    fn unknown_region_is_configuration_error() {
        assert!(Region::lookup("mars-north-1").is_none());
        assert!(matches!(
            Region::require("mars-north-1"),
            Err(AwsError::Configuration(_))
        ));
    }

    #[test]
    fn every_region_is_listed_once() {
        let names: Vec<_> = Region::all().map(|r| r.name()).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }
}
