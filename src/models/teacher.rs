use super::{OrganizationId, TeacherId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The seven teacher categories. Codes 2 and 6 are reserved and have no
/// reporting fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TeacherType {
    Seminar,
    Reserved2,
    Manha,
    Referent,
    Kindergarten,
    Reserved6,
    SpecialEducation,
}

impl TeacherType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(TeacherType::Seminar),
            2 => Some(TeacherType::Reserved2),
            3 => Some(TeacherType::Manha),
            4 => Some(TeacherType::Referent),
            5 => Some(TeacherType::Kindergarten),
            6 => Some(TeacherType::Reserved6),
            7 => Some(TeacherType::SpecialEducation),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            TeacherType::Seminar => 1,
            TeacherType::Reserved2 => 2,
            TeacherType::Manha => 3,
            TeacherType::Referent => 4,
            TeacherType::Kindergarten => 5,
            TeacherType::Reserved6 => 6,
            TeacherType::SpecialEducation => 7,
        }
    }

    /// Manha teachers file reports about other teachers, so their reports are
    /// keyed by the observed teacher rather than by date alone.
    pub fn reports_on_others(self) -> bool {
        matches!(self, TeacherType::Manha)
    }
}

impl TryFrom<u8> for TeacherType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        TeacherType::from_code(code).ok_or_else(|| format!("unknown teacher type code {}", code))
    }
}

impl From<TeacherType> for u8 {
    fn from(value: TeacherType) -> Self {
        value.code()
    }
}

impl fmt::Display for TeacherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeacherType::Seminar => write!(f, "seminar"),
            TeacherType::Reserved2 => write!(f, "reserved_2"),
            TeacherType::Manha => write!(f, "manha"),
            TeacherType::Referent => write!(f, "referent"),
            TeacherType::Kindergarten => write!(f, "kindergarten"),
            TeacherType::Reserved6 => write!(f, "reserved_6"),
            TeacherType::SpecialEducation => write!(f, "special_education"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Teacher {
    pub id: TeacherId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub phone: String,
    pub teacher_type: TeacherType,
}

impl Teacher {
    /// Compares phone numbers by their digits only, so `052-1234567` matches
    /// `0521234567`.
    pub fn has_phone(&self, phone: &str) -> bool {
        let stored = digits_only(&self.phone);
        !stored.is_empty() && stored == digits_only(phone)
    }

    pub fn phone_ends_with(&self, suffix: &str) -> bool {
        let suffix = digits_only(suffix);
        !suffix.is_empty() && digits_only(&self.phone).ends_with(&suffix)
    }
}

fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}
