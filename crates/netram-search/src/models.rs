use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One hit from a medical knowledge source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub source: String,
    pub title: String,
    pub summary: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Wikipedia,
    PubMed,
    MedlinePlus,
}

impl SourceKind {
    /// Label shown in results.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Wikipedia   => "Wikipedia",
            SourceKind::PubMed      => "PubMed",
            SourceKind::MedlinePlus => "MedlinePlus",
        }
    }
}

/// The `source` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSelector {
    #[default]
    All,
    Wikipedia,
    Pubmed,
    Medlineplus,
}

impl SourceSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSelector::All         => "all",
            SourceSelector::Wikipedia   => "wikipedia",
            SourceSelector::Pubmed      => "pubmed",
            SourceSelector::Medlineplus => "medlineplus",
        }
    }

    pub fn includes(&self, kind: SourceKind) -> bool {
        matches!(
            (self, kind),
            (SourceSelector::All, _)
                | (SourceSelector::Wikipedia, SourceKind::Wikipedia)
                | (SourceSelector::Pubmed, SourceKind::PubMed)
                | (SourceSelector::Medlineplus, SourceKind::MedlinePlus)
        )
    }
}

impl fmt::Display for SourceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all"    => Ok(SourceSelector::All),
            "wikipedia"   => Ok(SourceSelector::Wikipedia),
            "pubmed"      => Ok(SourceSelector::Pubmed),
            "medlineplus" => Ok(SourceSelector::Medlineplus),
            other         => Err(format!("unknown search source '{other}'")),
        }
    }
}
