use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// --- Admin user records ---

/// Role of a user record, decided once when the record is ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKind {
    Candidate,
    Recruiter,
    Unknown(String), // raw role as sent, "" when absent
}

impl UserKind {
    pub fn from_role(role: Option<&str>) -> Self {
        let raw = role.unwrap_or("");
        match raw.to_lowercase().as_str() {
            "candidate" => Self::Candidate,
            "recruiter" => Self::Recruiter,
            _ => Self::Unknown(raw.to_string()),
        }
    }
}

/// Which admin collection (and endpoint) a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Candidate,
    Recruiter,
}

impl ListKind {
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Candidate => "candidates",
            Self::Recruiter => "recruiters",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Recruiter => "recruiter",
        }
    }

    fn prefix(self) -> char {
        match self {
            Self::Candidate => 'c',
            Self::Recruiter => 'r',
        }
    }

    pub fn accepts(self, kind: &UserKind) -> bool {
        matches!(
            (self, kind),
            (Self::Candidate, UserKind::Candidate) | (Self::Recruiter, UserKind::Recruiter)
        )
    }
}

/// Identifies a row across both collections, e.g. `c-42` or `r-7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub list: ListKind,
    pub id: String,
}

impl RowKey {
    pub fn new(list: ListKind, id: impl Into<String>) -> Self {
        Self { list, id: id.into() }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.list.prefix(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub kind: UserKind,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUserRecord {
    #[serde(rename = "_id")]
    mongo_id: Option<Value>,
    id: Option<Value>,
    name: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    role: Option<String>,
    image: Option<String>,
}

fn id_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl UserRecord {
    /// Name shown in the list: explicit name, else "first last".
    pub fn display_name(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "{} {}",
                self.first_name.as_deref().unwrap_or(""),
                self.last_name.as_deref().unwrap_or("")
            )
            .trim()
            .to_string(),
        }
    }

    /// Parses an admin list response. Anything but an array is an empty
    /// list; elements without a usable id are skipped.
    pub fn parse_list(body: Value) -> Vec<UserRecord> {
        let Value::Array(items) = body else {
            tracing::warn!("user list response was not an array; treating as empty");
            return Vec::new();
        };

        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<RawUserRecord>(item) {
                Ok(raw) => {
                    let record = UserRecord::try_from(raw).ok();
                    if record.is_none() {
                        tracing::warn!("skipping user record without an id");
                    }
                    record
                }
                Err(e) => {
                    tracing::warn!("skipping malformed user record: {}", e);
                    None
                }
            })
            .collect()
    }
}

impl TryFrom<RawUserRecord> for UserRecord {
    type Error = ();

    fn try_from(raw: RawUserRecord) -> Result<Self, ()> {
        let id = id_string(raw.mongo_id).or_else(|| id_string(raw.id)).ok_or(())?;
        Ok(UserRecord {
            id,
            name: raw.name,
            first_name: raw.first_name,
            last_name: raw.last_name,
            email: raw.email.unwrap_or_default(),
            kind: UserKind::from_role(raw.role.as_deref()),
            image: raw.image,
        })
    }
}

// --- Job descriptors ---

const LONG_TEXT_KEYS: [&str; 4] = ["description", "jd", "details", "requirements"];
const MAX_FACT_CARDS: usize = 12;
const MAX_LIST_ITEMS: usize = 8;

/// Free-form job object as returned by `GET /jobs/{linkId}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobDescriptor(pub Map<String, Value>);

#[derive(Debug, Clone, PartialEq)]
pub enum FactValue {
    Text(String),
    Items(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactCard {
    pub label: String,
    pub value: FactValue,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// "yearsExp" -> "years Exp"
fn humanize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

impl JobDescriptor {
    fn text(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .filter(|v| !v.is_null())
            .map(value_text)
            .filter(|s| !s.is_empty())
    }

    pub fn title(&self) -> Option<String> {
        self.text("title")
            .or_else(|| self.text("role"))
            .or_else(|| self.text("name"))
    }

    pub fn company(&self) -> Option<String> {
        self.text("company")
    }

    pub fn fact_cards(&self) -> Vec<FactCard> {
        self.0
            .iter()
            .filter(|(k, v)| {
                let long_text = LONG_TEXT_KEYS.contains(&k.to_lowercase().as_str());
                !long_text && *k != "title" && !v.is_null()
            })
            .take(MAX_FACT_CARDS)
            .map(|(k, v)| FactCard {
                label: humanize_key(k),
                value: match v {
                    Value::Array(items) => FactValue::Items(
                        items.iter().take(MAX_LIST_ITEMS).map(value_text).collect(),
                    ),
                    other => FactValue::Text(value_text(other)),
                },
            })
            .collect()
    }
}

// --- Application wire types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Student,
    Postgraduate,
}

/// Body of `POST /jobs/{linkId}/apply`. Fields outside the applicant's
/// profile variant are left out of the JSON entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmission {
    pub name: String,
    pub email: String,
    pub profile_type: ProfileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cgpa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_fresher: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lpa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_exp: Option<f64>,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    #[serde(default)]
    pub already_applied: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppliedResponse {
    #[serde(default)]
    pub applied: bool,
}
