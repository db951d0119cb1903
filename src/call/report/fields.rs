//! Per-teacher-type field prompts.
//!
//! The table is closed over the seven teacher type codes. Codes 2 and 6 are
//! reserved and carry no prompts, which sends their callers straight from the
//! date to the confirmation step.

use super::state::FlowStep;
use super::{is_yes, ReportFlow};
use crate::call::app::{AppAction, ApplicationContext, CallController, InputConstraints};
use crate::error::FlowError;
use crate::models::{FieldKey, FieldValue, ReportFields, TeacherType};
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use std::fmt;
use tracing::{debug, info};

/// Upper bound on lessons-absence per teacher per calendar month.
pub const MAX_MONTHLY_ABSENCES: u32 = 10;

/// Most teachers the suffix lookup offers in one menu.
const MAX_TEACHER_CHOICES: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    SelfReport,
    OtherTeacher,
}

/// What the caller is offered after a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    None,
    AnotherDate,
    AnotherTeacher,
}

pub struct FieldPrompt {
    pub key: FieldKey,
    pub min_digits: usize,
    pub max_digits: usize,
    pub allowed_digits: Option<&'static str>,
    /// The prompt is skipped (and its field left unset) when this holds.
    pub skip_if: Option<fn(&ReportFields) -> bool>,
}

const fn number(key: FieldKey) -> FieldPrompt {
    FieldPrompt {
        key,
        min_digits: 1,
        max_digits: 2,
        allowed_digits: None,
        skip_if: None,
    }
}

const fn flag(key: FieldKey) -> FieldPrompt {
    FieldPrompt {
        key,
        min_digits: 1,
        max_digits: 1,
        allowed_digits: Some("12"),
        skip_if: None,
    }
}

const fn unless(mut prompt: FieldPrompt, skip: fn(&ReportFields) -> bool) -> FieldPrompt {
    prompt.skip_if = Some(skip);
    prompt
}

fn was_collective_watch(fields: &ReportFields) -> bool {
    fields.was_collective_watch == Some(true)
}

impl fmt::Debug for FieldPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldPrompt")
            .field("key", &self.key)
            .field("min_digits", &self.min_digits)
            .field("max_digits", &self.max_digits)
            .field("allowed_digits", &self.allowed_digits)
            .field("conditional", &self.skip_if.is_some())
            .finish()
    }
}

impl FieldPrompt {
    pub fn prompt_key(&self) -> String {
        format!("prompt_{}", self.key)
    }

    pub fn constraints(&self) -> InputConstraints {
        let constraints = InputConstraints::digits(self.min_digits, self.max_digits);
        match self.allowed_digits {
            Some(allowed) => constraints.with_allowed(allowed),
            None => constraints,
        }
    }

    pub fn is_skipped(&self, fields: &ReportFields) -> bool {
        self.skip_if.is_some_and(|skip| skip(fields))
    }

    /// Flags read `1` as yes and anything else as no.
    pub fn parse(&self, digits: &str) -> Option<FieldValue> {
        if self.key.is_flag() {
            Some(FieldValue::Flag(is_yes(digits)))
        } else {
            digits.parse().ok().map(FieldValue::Number)
        }
    }
}

#[derive(Debug)]
pub struct TeacherTypeFlow {
    pub teacher_type: TeacherType,
    pub self_prompts: &'static [FieldPrompt],
    /// Present only for types that may report on another teacher.
    pub other_prompts: Option<&'static [FieldPrompt]>,
    pub self_continuation: Continuation,
    pub other_continuation: Continuation,
}

static SEMINAR_PROMPTS: [FieldPrompt; 6] = [
    number(FieldKey::HowManyLessons),
    number(FieldKey::HowManyWatchOrIndividual),
    number(FieldKey::HowManyTeachedOrInterfering),
    flag(FieldKey::WasKamal),
    number(FieldKey::HowManyDiscussingLessons),
    number(FieldKey::HowManyLessonsAbsence),
];

static MANHA_SELF_PROMPTS: [FieldPrompt; 1] = [number(FieldKey::HowManyMethodic)];

static MANHA_OTHER_PROMPTS: [FieldPrompt; 6] = [
    number(FieldKey::HowManyWatchedLessons),
    number(FieldKey::HowManyStudentsTeached),
    number(FieldKey::HowManyYalkutLessons),
    number(FieldKey::HowManyDiscussingLessons),
    number(FieldKey::HowManyStudentsHelpTeached),
    number(FieldKey::HowManyTeachedOrInterfering),
];

static REFERENT_PROMPTS: [FieldPrompt; 4] = [
    number(FieldKey::HowManyLessons),
    number(FieldKey::HowManyWatchOrIndividual),
    number(FieldKey::HowManyTeachedOrInterfering),
    number(FieldKey::HowManyLessonsAbsence),
];

static KINDERGARTEN_PROMPTS: [FieldPrompt; 3] = [
    flag(FieldKey::WasCollectiveWatch),
    unless(number(FieldKey::HowManyStudents), was_collective_watch),
    unless(flag(FieldKey::WasStudentsGood), was_collective_watch),
];

static SPECIAL_EDUCATION_PROMPTS: [FieldPrompt; 3] = [
    number(FieldKey::HowManyLessons),
    number(FieldKey::HowManyStudents),
    flag(FieldKey::WasPhoneDiscussing),
];

static SEMINAR: TeacherTypeFlow = TeacherTypeFlow {
    teacher_type: TeacherType::Seminar,
    self_prompts: &SEMINAR_PROMPTS,
    other_prompts: None,
    self_continuation: Continuation::AnotherDate,
    other_continuation: Continuation::None,
};

static RESERVED_2: TeacherTypeFlow = TeacherTypeFlow {
    teacher_type: TeacherType::Reserved2,
    self_prompts: &[],
    other_prompts: None,
    self_continuation: Continuation::None,
    other_continuation: Continuation::None,
};

static MANHA: TeacherTypeFlow = TeacherTypeFlow {
    teacher_type: TeacherType::Manha,
    self_prompts: &MANHA_SELF_PROMPTS,
    other_prompts: Some(&MANHA_OTHER_PROMPTS),
    self_continuation: Continuation::None,
    other_continuation: Continuation::AnotherTeacher,
};

static REFERENT: TeacherTypeFlow = TeacherTypeFlow {
    teacher_type: TeacherType::Referent,
    self_prompts: &REFERENT_PROMPTS,
    other_prompts: None,
    self_continuation: Continuation::AnotherDate,
    other_continuation: Continuation::None,
};

static KINDERGARTEN: TeacherTypeFlow = TeacherTypeFlow {
    teacher_type: TeacherType::Kindergarten,
    self_prompts: &KINDERGARTEN_PROMPTS,
    other_prompts: None,
    self_continuation: Continuation::AnotherDate,
    other_continuation: Continuation::None,
};

static RESERVED_6: TeacherTypeFlow = TeacherTypeFlow {
    teacher_type: TeacherType::Reserved6,
    self_prompts: &[],
    other_prompts: None,
    self_continuation: Continuation::None,
    other_continuation: Continuation::None,
};

static SPECIAL_EDUCATION: TeacherTypeFlow = TeacherTypeFlow {
    teacher_type: TeacherType::SpecialEducation,
    self_prompts: &SPECIAL_EDUCATION_PROMPTS,
    other_prompts: None,
    self_continuation: Continuation::AnotherDate,
    other_continuation: Continuation::None,
};

impl TeacherTypeFlow {
    pub fn for_type(teacher_type: TeacherType) -> &'static TeacherTypeFlow {
        match teacher_type {
            TeacherType::Seminar => &SEMINAR,
            TeacherType::Reserved2 => &RESERVED_2,
            TeacherType::Manha => &MANHA,
            TeacherType::Referent => &REFERENT,
            TeacherType::Kindergarten => &KINDERGARTEN,
            TeacherType::Reserved6 => &RESERVED_6,
            TeacherType::SpecialEducation => &SPECIAL_EDUCATION,
        }
    }

    pub fn asks_report_mode(&self) -> bool {
        self.other_prompts.is_some()
    }

    pub fn prompts(&self, mode: ReportMode) -> &'static [FieldPrompt] {
        match (mode, self.other_prompts) {
            (ReportMode::OtherTeacher, Some(prompts)) => prompts,
            _ => self.self_prompts,
        }
    }

    pub fn continuation(&self, mode: ReportMode) -> Continuation {
        match (mode, self.other_prompts) {
            (ReportMode::OtherTeacher, Some(_)) => self.other_continuation,
            _ => self.self_continuation,
        }
    }

    /// Every field this type can fill in; a stored report with any of them
    /// set counts as an existing report for the date.
    pub fn relevant_fields(&self) -> Vec<FieldKey> {
        let mut keys: Vec<FieldKey> = self.self_prompts.iter().map(|p| p.key).collect();
        for prompt in self.other_prompts.unwrap_or(&[]) {
            if !keys.contains(&prompt.key) {
                keys.push(prompt.key);
            }
        }
        keys
    }
}

pub(super) fn month_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = date.with_day(1)?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

impl ReportFlow {
    /// Starts (or restarts) field collection for the chosen date.
    pub(super) async fn begin_fields(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        self.state.fields = ReportFields::default();
        let Some(flow) = self.state.flow() else {
            return Err(anyhow::anyhow!("teacher not resolved before field collection"));
        };
        if flow.asks_report_mode() {
            match self.state.reporting_on_other {
                None => {
                    self.state.step = FlowStep::ReportMode;
                    return Ok(ctrl.ask_for_menu(ctx.text("choose_report_mode"), &['1', '2']));
                }
                Some(true) if self.state.other_teacher.is_none() => {
                    return Ok(self.ask_other_teacher_phone(ctrl, ctx));
                }
                _ => {}
            }
        }
        self.ask_field(0, ctrl, ctx)
    }

    pub(super) async fn on_report_mode(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        if digits == "2" {
            self.state.reporting_on_other = Some(true);
            Ok(self.ask_other_teacher_phone(ctrl, ctx))
        } else {
            self.state.reporting_on_other = Some(false);
            self.ask_field(0, ctrl, ctx)
        }
    }

    fn ask_other_teacher_phone(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> AppAction {
        self.state.other_teacher = None;
        self.state.other_candidates.clear();
        self.state.step = FlowStep::OtherTeacherPhone;
        ctrl.ask_for_input(ctx.text("enter_other_teacher_phone"), InputConstraints::exact(4))
    }

    pub(super) async fn on_other_teacher_phone(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let teacher_id = self.teacher()?.id;
        let mut candidates: Vec<_> = ctx
            .store
            .find_teachers_by_phone_suffix(ctx.organization.id, digits)
            .await?
            .into_iter()
            .filter(|t| t.id != teacher_id)
            .collect();

        match candidates.len() {
            0 => Err(FlowError::UnknownTeacher(digits.to_string()).into()),
            1 => {
                self.state.other_teacher = candidates.pop();
                Ok(self.confirm_other_teacher(ctrl, ctx))
            }
            count => {
                debug!(count, suffix = digits, "several teachers match phone suffix");
                candidates.truncate(MAX_TEACHER_CHOICES);
                let mut options = Vec::with_capacity(candidates.len());
                let mut digits_offered = Vec::with_capacity(candidates.len());
                for (index, teacher) in candidates.iter().enumerate() {
                    let digit = char::from(b'1' + index as u8);
                    digits_offered.push(digit);
                    options.push(ctx.text_with(
                        "select_other_teacher_option",
                        &[("name", teacher.name.clone()), ("digit", digit.to_string())],
                    ));
                }
                self.state.other_candidates = candidates;
                self.state.step = FlowStep::SelectOtherTeacher;
                let prompt = ctx.text_with("select_other_teacher", &[("options", options.join(" "))]);
                Ok(ctrl.ask_for_menu(prompt, &digits_offered))
            }
        }
    }

    pub(super) async fn on_select_other_teacher(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let index = digits.parse::<usize>().unwrap_or(0).saturating_sub(1);
        match self.state.other_candidates.get(index).cloned() {
            Some(teacher) => {
                self.state.other_teacher = Some(teacher);
                self.state.other_candidates.clear();
                Ok(self.confirm_other_teacher(ctrl, ctx))
            }
            None => Ok(self.ask_other_teacher_phone(ctrl, ctx)),
        }
    }

    fn confirm_other_teacher(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> AppAction {
        let name = self
            .state
            .other_teacher
            .as_ref()
            .map(|t| t.name.clone())
            .unwrap_or_default();
        self.state.step = FlowStep::ConfirmOtherTeacher;
        ctrl.ask_confirmation(ctx.text_with("confirm_other_teacher", &[("name", name)]))
    }

    pub(super) async fn on_confirm_other_teacher(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        if is_yes(digits) {
            self.ask_field(0, ctrl, ctx)
        } else {
            Ok(self.ask_other_teacher_phone(ctrl, ctx))
        }
    }

    /// Asks the first prompt at or after `index` that is not skipped, or
    /// moves on to confirmation when none is left.
    pub(super) fn ask_field(
        &mut self,
        index: usize,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let prompts = self.state.prompts();
        let mut index = index;
        while let Some(prompt) = prompts.get(index) {
            if !prompt.is_skipped(&self.state.fields) {
                self.state.step = FlowStep::Field(index);
                return Ok(ctrl.ask_for_input(ctx.text(&prompt.prompt_key()), prompt.constraints()));
            }
            debug!(field = %prompt.key, "field skipped");
            self.state.fields.clear(prompt.key);
            index += 1;
        }
        Ok(self.confirm_report(ctrl, ctx))
    }

    pub(super) async fn on_field(
        &mut self,
        index: usize,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let Some(prompt) = self.state.prompts().get(index) else {
            return self.ask_field(index, ctrl, ctx);
        };
        let Some(value) = prompt.parse(digits) else {
            return self.ask_field(index, ctrl, ctx);
        };

        if let (FieldKey::HowManyLessonsAbsence, FieldValue::Number(absences)) = (prompt.key, value)
        {
            let used = self.monthly_absences(ctx).await?;
            if used + absences > MAX_MONTHLY_ABSENCES {
                info!(used, absences, "monthly absence ceiling exceeded");
                ctrl.send_message(ctx.text_with(
                    "absence_limit",
                    &[
                        ("max", MAX_MONTHLY_ABSENCES.to_string()),
                        ("used", used.to_string()),
                    ],
                ));
                return self.ask_field(index, ctrl, ctx);
            }
        }

        self.state.fields.set(prompt.key, value);
        self.ask_field(index + 1, ctrl, ctx)
    }

    /// Absences already saved for the report month, not counting the reports
    /// this call is about to replace.
    async fn monthly_absences(&self, ctx: &ApplicationContext) -> Result<u32> {
        let teacher = self.teacher()?;
        let date = self.state.report_date.unwrap_or_else(|| ctx.today());
        let Some((first, last)) = month_bounds(date) else {
            return Ok(0);
        };
        let reports = ctx
            .store
            .find_reports_between(ctx.organization.id, teacher.id, first, last)
            .await?;
        Ok(reports
            .iter()
            .filter(|r| !self.state.replaces.iter().any(|old| old.id == r.id))
            .filter_map(|r| r.fields.how_many_lessons_absence)
            .sum())
    }
}
