use super::{OrganizationId, ReportId, TeacherId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every column a teacher type may fill in. Each type uses a subset; the rest
/// stay `None` on its reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    HowManyLessons,
    HowManyWatchOrIndividual,
    HowManyTeachedOrInterfering,
    WasKamal,
    HowManyDiscussingLessons,
    HowManyLessonsAbsence,
    HowManyMethodic,
    HowManyWatchedLessons,
    HowManyStudentsTeached,
    HowManyYalkutLessons,
    HowManyStudentsHelpTeached,
    WasCollectiveWatch,
    HowManyStudents,
    WasStudentsGood,
    WasPhoneDiscussing,
}

impl FieldKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::HowManyLessons => "how_many_lessons",
            FieldKey::HowManyWatchOrIndividual => "how_many_watch_or_individual",
            FieldKey::HowManyTeachedOrInterfering => "how_many_teached_or_interfering",
            FieldKey::WasKamal => "was_kamal",
            FieldKey::HowManyDiscussingLessons => "how_many_discussing_lessons",
            FieldKey::HowManyLessonsAbsence => "how_many_lessons_absence",
            FieldKey::HowManyMethodic => "how_many_methodic",
            FieldKey::HowManyWatchedLessons => "how_many_watched_lessons",
            FieldKey::HowManyStudentsTeached => "how_many_students_teached",
            FieldKey::HowManyYalkutLessons => "how_many_yalkut_lessons",
            FieldKey::HowManyStudentsHelpTeached => "how_many_students_help_teached",
            FieldKey::WasCollectiveWatch => "was_collective_watch",
            FieldKey::HowManyStudents => "how_many_students",
            FieldKey::WasStudentsGood => "was_students_good",
            FieldKey::WasPhoneDiscussing => "was_phone_discussing",
        }
    }

    pub fn is_flag(self) -> bool {
        matches!(
            self,
            FieldKey::WasKamal
                | FieldKey::WasCollectiveWatch
                | FieldKey::WasStudentsGood
                | FieldKey::WasPhoneDiscussing
        )
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Number(u32),
    Flag(bool),
}

/// Superset of all teacher-type fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_lessons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_watch_or_individual: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_teached_or_interfering: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_kamal: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_discussing_lessons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_lessons_absence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_methodic: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_watched_lessons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_students_teached: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_yalkut_lessons: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_students_help_teached: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_collective_watch: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how_many_students: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_students_good: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_phone_discussing: Option<bool>,
}

impl ReportFields {
    fn number_slot(&mut self, key: FieldKey) -> Option<&mut Option<u32>> {
        match key {
            FieldKey::HowManyLessons => Some(&mut self.how_many_lessons),
            FieldKey::HowManyWatchOrIndividual => Some(&mut self.how_many_watch_or_individual),
            FieldKey::HowManyTeachedOrInterfering => {
                Some(&mut self.how_many_teached_or_interfering)
            }
            FieldKey::HowManyDiscussingLessons => Some(&mut self.how_many_discussing_lessons),
            FieldKey::HowManyLessonsAbsence => Some(&mut self.how_many_lessons_absence),
            FieldKey::HowManyMethodic => Some(&mut self.how_many_methodic),
            FieldKey::HowManyWatchedLessons => Some(&mut self.how_many_watched_lessons),
            FieldKey::HowManyStudentsTeached => Some(&mut self.how_many_students_teached),
            FieldKey::HowManyYalkutLessons => Some(&mut self.how_many_yalkut_lessons),
            FieldKey::HowManyStudentsHelpTeached => {
                Some(&mut self.how_many_students_help_teached)
            }
            FieldKey::HowManyStudents => Some(&mut self.how_many_students),
            _ => None,
        }
    }

    fn flag_slot(&mut self, key: FieldKey) -> Option<&mut Option<bool>> {
        match key {
            FieldKey::WasKamal => Some(&mut self.was_kamal),
            FieldKey::WasCollectiveWatch => Some(&mut self.was_collective_watch),
            FieldKey::WasStudentsGood => Some(&mut self.was_students_good),
            FieldKey::WasPhoneDiscussing => Some(&mut self.was_phone_discussing),
            _ => None,
        }
    }

    /// Stores `value` under `key`. A value of the wrong kind for the key is
    /// ignored.
    pub fn set(&mut self, key: FieldKey, value: FieldValue) {
        match value {
            FieldValue::Number(n) => {
                if let Some(slot) = self.number_slot(key) {
                    *slot = Some(n);
                }
            }
            FieldValue::Flag(b) => {
                if let Some(slot) = self.flag_slot(key) {
                    *slot = Some(b);
                }
            }
        }
    }

    pub fn get(&self, key: FieldKey) -> Option<FieldValue> {
        let number = match key {
            FieldKey::HowManyLessons => self.how_many_lessons,
            FieldKey::HowManyWatchOrIndividual => self.how_many_watch_or_individual,
            FieldKey::HowManyTeachedOrInterfering => self.how_many_teached_or_interfering,
            FieldKey::HowManyDiscussingLessons => self.how_many_discussing_lessons,
            FieldKey::HowManyLessonsAbsence => self.how_many_lessons_absence,
            FieldKey::HowManyMethodic => self.how_many_methodic,
            FieldKey::HowManyWatchedLessons => self.how_many_watched_lessons,
            FieldKey::HowManyStudentsTeached => self.how_many_students_teached,
            FieldKey::HowManyYalkutLessons => self.how_many_yalkut_lessons,
            FieldKey::HowManyStudentsHelpTeached => self.how_many_students_help_teached,
            FieldKey::HowManyStudents => self.how_many_students,
            FieldKey::WasKamal => return self.was_kamal.map(FieldValue::Flag),
            FieldKey::WasCollectiveWatch => return self.was_collective_watch.map(FieldValue::Flag),
            FieldKey::WasStudentsGood => return self.was_students_good.map(FieldValue::Flag),
            FieldKey::WasPhoneDiscussing => return self.was_phone_discussing.map(FieldValue::Flag),
        };
        number.map(FieldValue::Number)
    }

    pub fn clear(&mut self, key: FieldKey) {
        if let Some(slot) = self.number_slot(key) {
            *slot = None;
        } else if let Some(slot) = self.flag_slot(key) {
            *slot = None;
        }
    }

    pub fn any_set(&self, keys: &[FieldKey]) -> bool {
        keys.iter().any(|key| self.get(*key).is_some())
    }

    pub fn is_empty(&self) -> bool {
        *self == ReportFields::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceReport {
    /// Zero until the store assigns an id.
    #[serde(default)]
    pub id: ReportId,
    pub organization_id: OrganizationId,
    pub teacher_id: TeacherId,
    pub report_date: NaiveDate,
    #[serde(default)]
    pub is_confirmed: bool,
    #[serde(default)]
    pub salary_report_id: Option<u64>,
    /// The observed teacher, for reports filed by a manha.
    #[serde(default)]
    pub other_teacher_id: Option<TeacherId>,
    #[serde(default = "Utc::now")]
    pub update_date: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: ReportFields,
}

impl AttendanceReport {
    pub fn new(organization_id: OrganizationId, teacher_id: TeacherId, date: NaiveDate) -> Self {
        Self {
            id: 0,
            organization_id,
            teacher_id,
            report_date: date,
            is_confirmed: false,
            salary_report_id: None,
            other_teacher_id: None,
            update_date: Utc::now(),
            fields: ReportFields::default(),
        }
    }

    /// Confirmed or salary-linked reports can no longer be replaced by a call.
    pub fn is_locked(&self) -> bool {
        self.is_confirmed || self.salary_report_id.is_some()
    }
}
