//! User domain model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Countries a user may be registered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    #[serde(rename = "US")]
    Us,
    #[serde(rename = "CO")]
    Co,
    #[serde(rename = "TN")]
    Tn,
}

impl Country {
    pub const ALL: [Country; 3] = [Country::Us, Country::Co, Country::Tn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Us => "US",
            Country::Co => "CO",
            Country::Tn => "TN",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Country {
    type Err = Error;

    /// Codes are matched exactly; `us` is not `US`.
    fn from_str(s: &str) -> Result<Self> {
        Country::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                Error::constraint(format!(
                    "country must be one of US, CO, TN (got '{}')",
                    s
                ))
            })
    }
}

/// A registered user
///
/// `average_score` is a cached value owned by the score aggregator. It is
/// `None` until the first successful recomputation and can go stale when
/// corrections change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub country: Option<Country>,
    pub average_score: Option<f64>,
}

/// Fields supplied when a user signs up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub country: Option<Country>,
}

impl NewUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
            country: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_country(mut self, country: Country) -> Self {
        self.country = Some(country);
        self
    }

    /// Trim the email and reject an empty one
    pub fn normalized(mut self) -> Result<Self> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(Error::validation("email is required"));
        }
        self.email = email.to_string();
        self.name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(self)
    }
}
