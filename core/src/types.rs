//! Domain DTOs for the clinic API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined
//! independently; integration tests catch schema drift. The backend sends
//! the PHN as a JSON integer, so `Phn` wraps a `u32` and renders it back as
//! six zero-padded digits.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest value a six-digit PHN can hold.
const PHN_MAX: u32 = 999_999;

/// The value is not a six-digit Personal Health Number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid PHN: {0}")]
pub struct InvalidPhn(pub String);

/// Personal Health Number: the six-digit primary key of a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Phn(u32);

impl Phn {
    pub fn new(value: u32) -> Result<Self, InvalidPhn> {
        if value > PHN_MAX {
            return Err(InvalidPhn(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for Phn {
    type Error = InvalidPhn;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Phn::new(value)
    }
}

impl From<Phn> for u32 {
    fn from(phn: Phn) -> u32 {
        phn.0
    }
}

impl FromStr for Phn {
    type Err = InvalidPhn;

    /// Accepts exactly six ASCII digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidPhn(s.to_string()));
        }
        s.parse::<u32>()
            .map(Phn)
            .map_err(|_| InvalidPhn(s.to_string()))
    }
}

impl fmt::Display for Phn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// A patient record as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub phn: Phn,
    pub name: String,
    pub birth_date: NaiveDate,
    pub phone: String,
    pub email: String,
    pub address: String,
}

/// Request payload for creating a patient. The create endpoint reads the
/// birth date from `birthDate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPatient {
    pub phn: Phn,
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(rename = "birthDate")]
    pub birth_date: NaiveDate,
    pub address: String,
}

/// Request payload for replacing a patient, possibly under a new PHN.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdatePatient {
    pub original_phn: Phn,
    pub phn: Phn,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub birth_date: NaiveDate,
    pub address: String,
}

/// Page-number envelope returned by the list and search endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResults {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<Patient>,
}

/// Body of a successful create.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPatient {
    #[serde(default)]
    pub message: String,
    pub patient: Patient,
}

/// Generic `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Tokens issued at login.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phn_parses_six_digits_only() {
        assert_eq!("123456".parse::<Phn>().unwrap().value(), 123456);
        assert_eq!("012345".parse::<Phn>().unwrap().value(), 12345);
        assert!("12a456".parse::<Phn>().is_err());
        assert!("12345".parse::<Phn>().is_err());
        assert!("1234567".parse::<Phn>().is_err());
        assert!("+12345".parse::<Phn>().is_err());
    }

    #[test]
    fn phn_displays_zero_padded() {
        assert_eq!(Phn::new(42).unwrap().to_string(), "000042");
    }

    #[test]
    fn phn_rejects_seven_digit_numbers_from_json() {
        let result: Result<Phn, _> = serde_json::from_str("1000000");
        assert!(result.is_err());
    }

    #[test]
    fn patient_deserializes_backend_shape() {
        let json = r#"{"phn":123456,"name":"Jane Roe","birth_date":"1990-04-01",
            "phone":"2505550000","email":"jane@example.com","address":"1 Main St"}"#;
        let patient: Patient = serde_json::from_str(json).unwrap();
        assert_eq!(patient.phn.value(), 123456);
        assert_eq!(patient.birth_date, NaiveDate::from_ymd_opt(1990, 4, 1).unwrap());
    }

    #[test]
    fn new_patient_uses_camel_case_birth_date() {
        let input = NewPatient {
            phn: Phn::new(123456).unwrap(),
            name: "Jane Roe".to_string(),
            phone: "2505550000".to_string(),
            email: "jane@example.com".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 4, 1).unwrap(),
            address: "1 Main St".to_string(),
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["birthDate"], "1990-04-01");
        assert_eq!(json["phn"], 123456);
        assert!(json.get("birth_date").is_none());
    }

    #[test]
    fn search_results_only_require_results() {
        let parsed: SearchResults = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert_eq!(parsed.count, 0);
        assert!(parsed.next.is_none());
    }
}
