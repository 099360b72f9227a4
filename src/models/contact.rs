use serde::{Deserialize, Serialize};

/// Contact details extracted from one page, or merged across pages.
/// Empty string means the field was not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub person: String,
    pub phone: String,
    pub email: String,
}

impl ContactRecord {
    /// Phone and email are the fields worth crawling further for; the
    /// enrichment crawl stops early once both are present.
    pub fn has_phone_and_email(&self) -> bool {
        !self.phone.is_empty() && !self.email.is_empty()
    }

    /// Fold a ranked list of records into one: first non-empty value wins
    /// per field, earlier (higher-priority) records taking precedence.
    pub fn merge_ranked(records: &[ContactRecord]) -> ContactRecord {
        records.iter().fold(ContactRecord::default(), |mut best, r| {
            if best.person.is_empty() {
                best.person = r.person.clone();
            }
            if best.phone.is_empty() {
                best.phone = r.phone.clone();
            }
            if best.email.is_empty() {
                best.email = r.email.clone();
            }
            best
        })
    }
}
