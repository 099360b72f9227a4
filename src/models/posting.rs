use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Listing platforms this core can aggregate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourcePlatform {
    #[serde(rename = "104")]
    Tw104,
    #[serde(rename = "1111")]
    Tw1111,
    #[serde(rename = "cake")]
    Cake,
}

impl SourcePlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourcePlatform::Tw104 => "104",
            SourcePlatform::Tw1111 => "1111",
            SourcePlatform::Cake => "cake",
        }
    }
}

impl fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourcePlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "104" => Ok(SourcePlatform::Tw104),
            "1111" => Ok(SourcePlatform::Tw1111),
            "cake" | "cakeresume" => Ok(SourcePlatform::Cake),
            other => Err(format!("Unknown platform: {other}")),
        }
    }
}

/// One normalized job listing. Contact fields use the empty string for
/// "missing" so enrichment can fill them without an Option/empty split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub source_platform: SourcePlatform,
    pub company: String,
    pub title: String,
    pub salary_range: String,
    pub location: String,
    pub experience: String,
    pub description: String,
    pub link: String,
    pub last_updated: String,
    pub contact_person: String,
    pub contact_phone: String,
    pub contact_email: String,
    /// Tag applied by the orchestrator; may differ from `source_platform`
    /// when a batch is re-tagged for caching.
    pub platform: String,
}

impl JobPosting {
    pub fn new(platform: SourcePlatform, company: String, title: String) -> Self {
        Self {
            source_platform: platform,
            company,
            title,
            salary_range: String::new(),
            location: String::new(),
            experience: String::new(),
            description: String::new(),
            link: String::new(),
            last_updated: String::new(),
            contact_person: String::new(),
            contact_phone: String::new(),
            contact_email: String::new(),
            platform: platform.as_str().to_string(),
        }
    }

    pub fn has_complete_contact(&self) -> bool {
        !self.contact_person.is_empty()
            && !self.contact_phone.is_empty()
            && !self.contact_email.is_empty()
    }
}

/// Description cap applied by every adapter.
pub const MAX_DESCRIPTION_CHARS: usize = 300;

/// Collapse whitespace runs and cap at [`MAX_DESCRIPTION_CHARS`] characters.
pub fn clean_description(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_DESCRIPTION_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for p in [
            SourcePlatform::Tw104,
            SourcePlatform::Tw1111,
            SourcePlatform::Cake,
        ] {
            assert_eq!(p.as_str().parse::<SourcePlatform>().unwrap(), p);
        }
        assert!("linkedin".parse::<SourcePlatform>().is_err());
    }

    #[test]
    fn clean_description_collapses_and_caps() {
        assert_eq!(clean_description("  a\n\tb   c "), "a b c");

        let long = "字".repeat(400);
        assert_eq!(clean_description(&long).chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn complete_contact_requires_all_three_fields() {
        let mut posting =
            JobPosting::new(SourcePlatform::Tw104, "甲公司".into(), "工程師".into());
        assert!(!posting.has_complete_contact());

        posting.contact_person = "王小姐".into();
        posting.contact_phone = "02-2345-6789".into();
        assert!(!posting.has_complete_contact());

        posting.contact_email = "hr@example.org".into();
        assert!(posting.has_complete_contact());
    }
}
