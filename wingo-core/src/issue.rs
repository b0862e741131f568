use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Identifiant de période : entier décimal de précision arbitraire, stocké tel que reçu.
///
/// Les comparaisons ignorent les zéros de tête ("007" == "7") et ne passent jamais par
/// un entier machine, les numéros de période dépassant u64 sur la durée de vie du flux.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IssueId(String);

impl IssueId {
    pub fn parse(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if s.is_empty() {
            bail!("Identifiant de période vide");
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            bail!("Identifiant de période non numérique : '{}'", s);
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chiffres significatifs (sans zéros de tête, "0" pour zéro).
    fn significant(&self) -> &str {
        let trimmed = self.0.trim_start_matches('0');
        if trimmed.is_empty() {
            "0"
        } else {
            trimmed
        }
    }

    /// Période suivante (+1), en conservant la largeur : "0099" -> "0100", "999" -> "1000".
    pub fn next(&self) -> IssueId {
        let mut digits: Vec<u8> = self.0.bytes().collect();
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if !carry {
                break;
            }
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
        // Uniquement des chiffres ASCII
        IssueId(digits.into_iter().map(char::from).collect())
    }

    pub fn last_digit(&self) -> u8 {
        self.0.bytes().last().map(|b| b - b'0').unwrap_or(0)
    }
}

impl PartialEq for IssueId {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for IssueId {}

impl Hash for IssueId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl Ord for IssueId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.significant(), other.significant());
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    }
}

impl PartialOrd for IssueId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<u64> for IssueId {
    fn from(n: u64) -> Self {
        IssueId(n.to_string())
    }
}

impl FromStr for IssueId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        IssueId::parse(s)
    }
}

impl TryFrom<String> for IssueId {
    type Error = anyhow::Error;

    fn try_from(s: String) -> Result<Self> {
        IssueId::parse(&s)
    }
}

impl From<IssueId> for String {
    fn from(id: IssueId) -> String {
        id.0
    }
}

impl std::fmt::Display for IssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
