//! Job application form: profile variants, skills, duplicate detection and
//! the submit flow.

pub mod duplicate;
pub mod form;
pub mod profile;
pub mod skills;

pub use form::{ApplicationForm, Phase, SubmitOutcome};
pub use profile::{DEGREE_OPTIONS, Field, ProfileVariant};
