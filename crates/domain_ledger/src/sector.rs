//! Economic sectors and the sector tree
//!
//! Sectors form a shallow tree rooted at "00", which also stands for
//! "no sector" on accounts that are not broken down.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use core_kernel::DomainPort;

use crate::error::LedgerError;

/// A sector code such as "00" or "0102"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SectorCode(String);

impl SectorCode {
    pub const ROOT: &'static str = "00";

    /// The root sector, "00"
    pub fn root() -> Self {
        Self(Self::ROOT.to_string())
    }

    /// Parses a numeric sector code
    pub fn parse(value: &str) -> Result<Self, LedgerError> {
        let value = value.trim();
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(LedgerError::InvalidSectorCode(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == Self::ROOT
    }
}

impl Default for SectorCode {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for SectorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SectorCode {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SectorCode> for String {
    fn from(code: SectorCode) -> String {
        code.0
    }
}

/// A node of the sector tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub code: SectorCode,
    pub name: String,
    /// `None` only for the root
    pub parent: Option<SectorCode>,
}

/// Read access to the sector tree
pub trait SectorHierarchy: DomainPort {
    /// Parent of `code`; `Ok(None)` for the root
    ///
    /// # Errors
    ///
    /// Returns `UnknownSector` if `code` is not in the tree
    fn parent(&self, code: &SectorCode) -> Result<Option<SectorCode>, LedgerError>;

    /// Direct children of `code`
    fn children(&self, code: &SectorCode) -> Vec<SectorCode>;
}

/// In-memory sector tree
#[derive(Debug, Clone)]
pub struct SectorCatalog {
    sectors: BTreeMap<SectorCode, Sector>,
}

impl Default for SectorCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl SectorCatalog {
    /// Creates a catalog containing only the root sector
    pub fn new() -> Self {
        let mut sectors = BTreeMap::new();
        sectors.insert(
            SectorCode::root(),
            Sector {
                code: SectorCode::root(),
                name: "Sin sector".to_string(),
                parent: None,
            },
        );
        Self { sectors }
    }

    /// Adds a sector under `parent`
    ///
    /// # Errors
    ///
    /// - `SectorAlreadyExists` if the code is taken
    /// - `UnknownSector` if the parent is not registered yet
    pub fn add_sector(
        &mut self,
        code: SectorCode,
        name: impl Into<String>,
        parent: SectorCode,
    ) -> Result<(), LedgerError> {
        if self.sectors.contains_key(&code) {
            return Err(LedgerError::SectorAlreadyExists(code.to_string()));
        }
        if !self.sectors.contains_key(&parent) {
            return Err(LedgerError::UnknownSector(parent.to_string()));
        }
        self.sectors.insert(
            code.clone(),
            Sector {
                code,
                name: name.into(),
                parent: Some(parent),
            },
        );
        Ok(())
    }

    pub fn get(&self, code: &SectorCode) -> Option<&Sector> {
        self.sectors.get(code)
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

impl DomainPort for SectorCatalog {}

impl SectorHierarchy for SectorCatalog {
    fn parent(&self, code: &SectorCode) -> Result<Option<SectorCode>, LedgerError> {
        self.sectors
            .get(code)
            .map(|sector| sector.parent.clone())
            .ok_or_else(|| LedgerError::UnknownSector(code.to_string()))
    }

    fn children(&self, code: &SectorCode) -> Vec<SectorCode> {
        self.sectors
            .values()
            .filter(|sector| sector.parent.as_ref() == Some(code))
            .map(|sector| sector.code.clone())
            .collect()
    }
}
