use super::fields::{FieldPrompt, ReportMode, TeacherTypeFlow};
use crate::models::{AnswerId, AttendanceReport, Question, ReportFields, Teacher};
use chrono::NaiveDate;
use std::fmt;

/// The step whose read is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    Start,
    Question,
    ChooseMode,
    EnterDate,
    ConfirmDate,
    ReportMode,
    OtherTeacherPhone,
    SelectOtherTeacher,
    ConfirmOtherTeacher,
    Field(usize),
    ConfirmReport,
    Continuation,
    ChooseMonth,
    ReviewReport,
    Done,
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowStep::Start => write!(f, "start"),
            FlowStep::Question => write!(f, "question"),
            FlowStep::ChooseMode => write!(f, "choose_mode"),
            FlowStep::EnterDate => write!(f, "enter_date"),
            FlowStep::ConfirmDate => write!(f, "confirm_date"),
            FlowStep::ReportMode => write!(f, "report_mode"),
            FlowStep::OtherTeacherPhone => write!(f, "other_teacher_phone"),
            FlowStep::SelectOtherTeacher => write!(f, "select_other_teacher"),
            FlowStep::ConfirmOtherTeacher => write!(f, "confirm_other_teacher"),
            FlowStep::Field(index) => write!(f, "field_{}", index),
            FlowStep::ConfirmReport => write!(f, "confirm_report"),
            FlowStep::Continuation => write!(f, "continuation"),
            FlowStep::ChooseMonth => write!(f, "choose_month"),
            FlowStep::ReviewReport => write!(f, "review_report"),
            FlowStep::Done => write!(f, "done"),
        }
    }
}

/// Unconfirmed reports being read back one by one.
#[derive(Debug, Clone)]
pub struct ReviewState {
    pub reports: Vec<AttendanceReport>,
    pub index: usize,
}

impl ReviewState {
    pub fn current(&self) -> Option<&AttendanceReport> {
        self.reports.get(self.index)
    }
}

/// Everything one call has collected so far. Lives only as long as the call.
#[derive(Debug, Clone)]
pub struct CallState {
    pub step: FlowStep,
    pub teacher: Option<Teacher>,
    /// Questions still to be asked, in order.
    pub questions: Vec<Question>,
    /// Answers saved during this call that still await a report link.
    pub answer_ids: Vec<AnswerId>,
    pub report_date: Option<NaiveDate>,
    pub fields: ReportFields,
    /// Unconfirmed reports for the same date that the commit will supersede.
    pub replaces: Vec<AttendanceReport>,
    /// Manha only: `Some(true)` when reporting on another teacher.
    pub reporting_on_other: Option<bool>,
    pub other_teacher: Option<Teacher>,
    pub other_candidates: Vec<Teacher>,
    pub review: Option<ReviewState>,
}

impl Default for CallState {
    fn default() -> Self {
        Self {
            step: FlowStep::Start,
            teacher: None,
            questions: Vec::new(),
            answer_ids: Vec::new(),
            report_date: None,
            fields: ReportFields::default(),
            replaces: Vec::new(),
            reporting_on_other: None,
            other_teacher: None,
            other_candidates: Vec::new(),
            review: None,
        }
    }
}

impl CallState {
    pub fn flow(&self) -> Option<&'static TeacherTypeFlow> {
        self.teacher
            .as_ref()
            .map(|t| TeacherTypeFlow::for_type(t.teacher_type))
    }

    pub fn mode(&self) -> ReportMode {
        if self.reporting_on_other == Some(true) {
            ReportMode::OtherTeacher
        } else {
            ReportMode::SelfReport
        }
    }

    /// Prompts for the current teacher type and mode.
    pub fn prompts(&self) -> &'static [FieldPrompt] {
        self.flow().map(|f| f.prompts(self.mode())).unwrap_or(&[])
    }

    /// Drops the values typed in the current attempt. The chosen date and
    /// any pending replacement are kept.
    pub fn discard_attempt(&mut self) {
        self.fields = ReportFields::default();
        self.reporting_on_other = None;
        self.other_teacher = None;
        self.other_candidates.clear();
    }

    /// Forgets the date and everything that depended on it.
    pub fn reset_date(&mut self) {
        self.report_date = None;
        self.replaces.clear();
        self.fields = ReportFields::default();
    }
}
