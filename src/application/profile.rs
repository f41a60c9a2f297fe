//! Applicant profile variants and the validation/payload rules for each.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ApplicationSubmission, ProfileType};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

pub const DEGREE_OPTIONS: [&str; 10] = [
    "BTech", "BE", "MTech", "ME", "BSc", "MSc", "BCA", "MCA", "MBA", "Other",
];

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Strict decimal parse; rejects empty, non-numeric, NaN and infinities.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Name,
    Email,
    College,
    Company,
    Cgpa,
    Degree,
    Lpa,
    YearsExp,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::College => "college",
            Self::Company => "company",
            Self::Cgpa => "cgpa",
            Self::Degree => "degree",
            Self::Lpa => "lpa",
            Self::YearsExp => "yearsExp",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub type ValidationErrors = BTreeMap<Field, String>;

/// Raw text of every input, exactly as typed.
#[derive(Debug, Clone, PartialEq)]
pub struct FormFields {
    pub name: String,
    pub email: String,
    pub college: String,
    pub company: String,
    pub cgpa: String,
    pub profile_type: ProfileType,
    pub is_fresher: bool,
    pub degree: String,
    pub lpa: String,
    pub years_exp: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: String::new(),
            college: String::new(),
            company: String::new(),
            cgpa: String::new(),
            profile_type: ProfileType::Student,
            is_fresher: false,
            degree: String::new(),
            lpa: String::new(),
            years_exp: String::new(),
        }
    }
}

impl FormFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::College => &self.college,
            Field::Company => &self.company,
            Field::Cgpa => &self.cgpa,
            Field::Degree => &self.degree,
            Field::Lpa => &self.lpa,
            Field::YearsExp => &self.years_exp,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Name => &mut self.name,
            Field::Email => &mut self.email,
            Field::College => &mut self.college,
            Field::Company => &mut self.company,
            Field::Cgpa => &mut self.cgpa,
            Field::Degree => &mut self.degree,
            Field::Lpa => &mut self.lpa,
            Field::YearsExp => &mut self.years_exp,
        }
    }

    pub fn variant(&self) -> ProfileVariant {
        match (self.profile_type, self.is_fresher) {
            (ProfileType::Student, _) => ProfileVariant::Student,
            (ProfileType::Postgraduate, true) => ProfileVariant::Fresher,
            (ProfileType::Postgraduate, false) => ProfileVariant::Experienced,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVariant {
    Student,
    Fresher,
    Experienced,
}

impl ProfileVariant {
    /// Inputs shown (and read) for this variant besides name and email.
    pub fn fields(self) -> &'static [Field] {
        match self {
            Self::Student => &[Field::College, Field::Cgpa],
            Self::Fresher => &[Field::Degree, Field::College, Field::Cgpa],
            Self::Experienced => &[Field::Company, Field::Lpa, Field::YearsExp],
        }
    }
}

/// A validated applicant, carrying exactly the fields its variant needs.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplicantProfile {
    Student {
        college: String,
        cgpa: Option<f64>,
    },
    Fresher {
        degree: String,
        college: String,
        cgpa: f64,
    },
    Experienced {
        company: String,
        lpa: f64,
        years_exp: f64,
    },
}

fn required_number(
    raw: &str,
    field: Field,
    missing: &str,
    invalid: &str,
    errors: &mut ValidationErrors,
) -> Option<f64> {
    if raw.trim().is_empty() {
        errors.insert(field, missing.to_string());
        return None;
    }
    let parsed = parse_number(raw);
    if parsed.is_none() {
        errors.insert(field, invalid.to_string());
    }
    parsed
}

fn required_text(raw: &str, field: Field, missing: &str, errors: &mut ValidationErrors) -> bool {
    if raw.trim().is_empty() {
        errors.insert(field, missing.to_string());
        return false;
    }
    true
}

impl ApplicantProfile {
    fn from_student(fields: &FormFields, errors: &mut ValidationErrors) -> Option<Self> {
        let college_ok = required_text(
            &fields.college,
            Field::College,
            "College is required for students",
            errors,
        );
        let cgpa = if fields.cgpa.trim().is_empty() {
            Some(None)
        } else {
            match parse_number(&fields.cgpa) {
                Some(n) => Some(Some(n)),
                None => {
                    errors.insert(Field::Cgpa, "CGPA must be a number".to_string());
                    None
                }
            }
        };
        match (college_ok, cgpa) {
            (true, Some(cgpa)) => Some(Self::Student {
                college: fields.college.clone(),
                cgpa,
            }),
            _ => None,
        }
    }

    fn from_fresher(fields: &FormFields, errors: &mut ValidationErrors) -> Option<Self> {
        let degree_ok = required_text(&fields.degree, Field::Degree, "Select your degree", errors);
        let college_ok =
            required_text(&fields.college, Field::College, "College is required", errors);
        let cgpa = required_number(
            &fields.cgpa,
            Field::Cgpa,
            "CGPA is required",
            "CGPA must be a number",
            errors,
        );
        match (degree_ok, college_ok, cgpa) {
            (true, true, Some(cgpa)) => Some(Self::Fresher {
                degree: fields.degree.clone(),
                college: fields.college.clone(),
                cgpa,
            }),
            _ => None,
        }
    }

    fn from_experienced(fields: &FormFields, errors: &mut ValidationErrors) -> Option<Self> {
        let company_ok = required_text(
            &fields.company,
            Field::Company,
            "Company is required (or mark Fresher)",
            errors,
        );
        let lpa = required_number(
            &fields.lpa,
            Field::Lpa,
            "LPA is required",
            "Enter a valid LPA",
            errors,
        );
        let years_exp = required_number(
            &fields.years_exp,
            Field::YearsExp,
            "Years of experience is required",
            "Enter valid years",
            errors,
        );
        match (company_ok, lpa, years_exp) {
            (true, Some(lpa), Some(years_exp)) => Some(Self::Experienced {
                company: fields.company.clone(),
                lpa,
                years_exp,
            }),
            _ => None,
        }
    }

    pub fn profile_type(&self) -> ProfileType {
        match self {
            Self::Student { .. } => ProfileType::Student,
            Self::Fresher { .. } | Self::Experienced { .. } => ProfileType::Postgraduate,
        }
    }
}

/// Everything needed to build a submission, after validation passed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidApplication {
    pub name: String,
    pub email: String,
    pub profile: ApplicantProfile,
}

/// Checks the common fields plus the active variant's fields. Every
/// problem is reported, not just the first.
pub fn validate(fields: &FormFields) -> Result<ValidApplication, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    required_text(&fields.name, Field::Name, "Name is required", &mut errors);
    if fields.email.trim().is_empty() {
        errors.insert(Field::Email, "Email is required".to_string());
    } else if !is_valid_email(&fields.email) {
        errors.insert(Field::Email, "Enter a valid email".to_string());
    }

    let profile = match fields.variant() {
        ProfileVariant::Student => ApplicantProfile::from_student(fields, &mut errors),
        ProfileVariant::Fresher => ApplicantProfile::from_fresher(fields, &mut errors),
        ProfileVariant::Experienced => ApplicantProfile::from_experienced(fields, &mut errors),
    };

    match profile {
        Some(profile) if errors.is_empty() => Ok(ValidApplication {
            name: fields.name.clone(),
            email: fields.email.clone(),
            profile,
        }),
        _ => Err(errors),
    }
}

impl ValidApplication {
    pub fn into_submission(self, skills: Vec<String>) -> ApplicationSubmission {
        let profile_type = self.profile.profile_type();
        let mut submission = ApplicationSubmission {
            name: self.name,
            email: self.email,
            profile_type,
            college: None,
            cgpa: None,
            is_fresher: None,
            degree: None,
            company: None,
            lpa: None,
            years_exp: None,
            skills,
        };

        match self.profile {
            ApplicantProfile::Student { college, cgpa } => {
                submission.college = Some(college);
                submission.cgpa = cgpa;
            }
            ApplicantProfile::Fresher { degree, college, cgpa } => {
                submission.is_fresher = Some(true);
                submission.degree = Some(degree);
                submission.college = Some(college);
                submission.cgpa = Some(cgpa);
            }
            ApplicantProfile::Experienced { company, lpa, years_exp } => {
                submission.is_fresher = Some(false);
                submission.company = Some(company);
                submission.lpa = Some(lpa);
                submission.years_exp = Some(years_exp);
            }
        }
        submission
    }
}
