use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::domain::{AccountKind, Package, PackageDraft};

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    UnknownAccountKind { line: u64, value: String },
    ZeroValidity { line: u64, name: String },
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read package catalog: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid package catalog CSV: {}", err),
            CatalogImportError::UnknownAccountKind { line, value } => write!(
                f,
                "line {}: account kind '{}' is neither Candidate nor Recruiter",
                line, value
            ),
            CatalogImportError::ZeroValidity { line, name } => write!(
                f,
                "line {}: package '{}' must be valid for at least one day",
                line, name
            ),
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::UnknownAccountKind { .. }
            | CatalogImportError::ZeroValidity { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads package plans from an administrator-maintained CSV export.
///
/// Expected header: `Name,Account Kind,Price,Validity Days,Description,Available`. The
/// `Available` column is optional and defaults to true.
pub struct PackageCatalogImporter;

impl PackageCatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<PackageDraft>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<PackageDraft>, CatalogImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut drafts = Vec::new();

        for record in csv_reader.records() {
            let record = record?;
            let mut row: PackageRow = record.deserialize(Some(&headers))?;
            // quoted fields may span lines, so use where the record starts
            row.line = record.position().map(csv::Position::line).unwrap_or_default();
            drafts.push(row.into_draft()?);
        }

        Ok(drafts)
    }
}

#[derive(Debug, Deserialize)]
struct PackageRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Account Kind")]
    account_kind: String,
    #[serde(rename = "Price")]
    price: u32,
    #[serde(rename = "Validity Days")]
    validity_days: u32,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Available", default = "default_available", deserialize_with = "flag")]
    available: bool,
    #[serde(skip)]
    line: u64,
}

impl PackageRow {
    fn into_draft(self) -> Result<PackageDraft, CatalogImportError> {
        let account_kind = AccountKind::parse(&self.account_kind).ok_or_else(|| {
            CatalogImportError::UnknownAccountKind {
                line: self.line,
                value: self.account_kind.clone(),
            }
        })?;

        if self.validity_days == 0 {
            return Err(CatalogImportError::ZeroValidity {
                line: self.line,
                name: self.name,
            });
        }

        Ok(PackageDraft {
            name: self.name,
            account_kind,
            price: self.price,
            validity_days: self.validity_days,
            description: self.description,
            available: self.available,
        })
    }
}

fn default_available() -> bool {
    true
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected a yes/no flag, found '{other}'"
        ))),
    }
}

/// Packages a given account kind may purchase, cheapest first.
pub fn offers_for(packages: &[Package], kind: AccountKind) -> Vec<Package> {
    let mut offers: Vec<Package> = packages
        .iter()
        .filter(|package| package.is_offered_to(kind))
        .cloned()
        .collect();
    offers.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id)));
    offers
}

/// Built-in plans used when no catalog export is configured.
pub fn default_catalog() -> Vec<PackageDraft> {
    vec![
        PackageDraft {
            name: "Candidate Monthly".to_string(),
            account_kind: AccountKind::Candidate,
            price: 199,
            validity_days: 30,
            description: "Job search, job details and proposals for 30 days".to_string(),
            available: true,
        },
        PackageDraft {
            name: "Candidate Quarterly".to_string(),
            account_kind: AccountKind::Candidate,
            price: 499,
            validity_days: 90,
            description: "Job search, job details and proposals for 90 days".to_string(),
            available: true,
        },
        PackageDraft {
            name: "Recruiter Monthly".to_string(),
            account_kind: AccountKind::Recruiter,
            price: 999,
            validity_days: 30,
            description: "Job posting and candidate search for 30 days".to_string(),
            available: true,
        },
        PackageDraft {
            name: "Recruiter Annual".to_string(),
            account_kind: AccountKind::Recruiter,
            price: 8999,
            validity_days: 365,
            description: "Job posting and candidate search for a full year".to_string(),
            available: true,
        },
    ]
}
