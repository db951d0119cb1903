//! Test harness for [`CallApp`](super::CallApp) implementations.
//!
//! [`MockGateway`] plays the telephony gateway: it sends one
//! [`TurnRequest`] per keypress into a real [`CallSessionManager`] backed by
//! a [`MemoryStore`], and keeps the last [`TurnReply`] for assertions.
//!
//! Texts come from an empty catalog, so every message and prompt is the bare
//! text key (with no parameters rendered). That keeps assertions independent
//! of wording.
//!
//! # Quick start
//!
//! ```rust,ignore
//! let mut gw = MockGateway::new();
//! gw.dial(SEMINAR_PHONE).await.assert_prompt("choose_date_mode");
//! gw.press("1").await.assert_prompt("confirm_date");
//! ```

use super::{CallSessionManager, TurnReply, TurnRequest};
use crate::config::{CelebrationsConfig, Config};
use crate::models::{
    AttendanceReport, Organization, ReportFields, Teacher, TeacherType, WorkingDate,
};
use crate::store::{MemoryStore, StoreFixtures};
use crate::texts::TextCatalog;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

pub const LINE: &str = "0730001111";
pub const ORG_ID: u64 = 1;

pub const SEMINAR_ID: u64 = 1;
pub const SEMINAR_PHONE: &str = "0521110001";
pub const KINDERGARTEN_ID: u64 = 2;
pub const KINDERGARTEN_PHONE: &str = "0521110002";
pub const MANHA_ID: u64 = 3;
pub const MANHA_PHONE: &str = "0521110003";
pub const REFERENT_ID: u64 = 4;
pub const REFERENT_PHONE: &str = "0521110004";
pub const SPECIAL_ID: u64 = 5;
pub const SPECIAL_PHONE: &str = "0521110005";
/// Only teacher whose phone ends with `4321`.
pub const OBSERVED_ID: u64 = 6;
/// Teachers 7 and 8 both end with `4567`.
pub const SHARED_SUFFIX: &str = "4567";
pub const RESERVED_PHONE: &str = "0521110009";

pub const CELEBRATIONS_CODE: &str = "770";

/// Tuesday 10 March 2026, 10:00 in Jerusalem.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

fn teacher(id: u64, name: &str, phone: &str, teacher_type: TeacherType) -> Teacher {
    Teacher {
        id,
        organization_id: ORG_ID,
        name: name.to_string(),
        phone: phone.to_string(),
        teacher_type,
    }
}

/// One organization, one teacher per type, and working days on every date
/// of February and March 2026 up to the 10th, except Fridays and Saturdays.
pub fn fixtures() -> StoreFixtures {
    let teachers = vec![
        teacher(SEMINAR_ID, "Rivka", SEMINAR_PHONE, TeacherType::Seminar),
        teacher(KINDERGARTEN_ID, "Leah", KINDERGARTEN_PHONE, TeacherType::Kindergarten),
        teacher(MANHA_ID, "Sarah", MANHA_PHONE, TeacherType::Manha),
        teacher(REFERENT_ID, "Miriam", REFERENT_PHONE, TeacherType::Referent),
        teacher(SPECIAL_ID, "Chana", SPECIAL_PHONE, TeacherType::SpecialEducation),
        teacher(OBSERVED_ID, "Dina", "0529994321", TeacherType::Seminar),
        teacher(7, "Esther", "0541234567", TeacherType::Referent),
        teacher(8, "Tova", "0501234567", TeacherType::Kindergarten),
        teacher(9, "Yael", RESERVED_PHONE, TeacherType::Reserved2),
    ];

    let mut working_dates = Vec::new();
    let days = (1..=28).map(|d| date(2, d)).chain((1..=10).map(|d| date(3, d)));
    for day in days {
        use chrono::{Datelike, Weekday};
        if matches!(day.weekday(), Weekday::Fri | Weekday::Sat) {
            continue;
        }
        for code in 1..=7 {
            if let Some(teacher_type) = TeacherType::from_code(code) {
                working_dates.push(WorkingDate {
                    organization_id: ORG_ID,
                    teacher_type,
                    date: day,
                });
            }
        }
    }

    StoreFixtures {
        organizations: vec![Organization::new(ORG_ID, "Beit Chana", LINE)],
        teachers,
        working_dates,
        ..Default::default()
    }
}

/// Saved report for `teacher_id` with the given fields.
pub fn report(teacher_id: u64, date: NaiveDate, fields: ReportFields) -> AttendanceReport {
    let mut report = AttendanceReport::new(ORG_ID, teacher_id, date);
    report.fields = fields;
    report
}

pub fn test_config() -> Config {
    Config {
        celebrations: Some(CelebrationsConfig {
            code: CELEBRATIONS_CODE.to_string(),
            target: "celebrations".to_string(),
        }),
        ..Default::default()
    }
}

pub struct MockGateway {
    pub store: Arc<MemoryStore>,
    pub manager: CallSessionManager,
    pub call_id: String,
    caller: String,
    called: String,
    last: Option<TurnReply>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::with_fixtures(fixtures())
    }

    pub fn with_fixtures(fixtures: StoreFixtures) -> Self {
        Self::with_store(MemoryStore::new(fixtures))
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let manager = CallSessionManager::new(
            store.clone(),
            Arc::new(TextCatalog::empty()),
            Arc::new(test_config()),
        )
        .unwrap()
        .with_clock(Box::new(test_now));
        Self {
            store,
            manager,
            call_id: "call-1".to_string(),
            caller: String::new(),
            called: LINE.to_string(),
            last: None,
        }
    }

    /// Starts a new call from `caller` on the organization line.
    pub async fn dial(&mut self, caller: &str) -> &TurnReply {
        self.dial_with(caller, LINE, None).await
    }

    pub async fn dial_with(&mut self, caller: &str, called: &str, digits: Option<&str>) -> &TurnReply {
        self.caller = caller.to_string();
        self.called = called.to_string();
        self.send(digits.map(str::to_string), false).await
    }

    /// Answers the outstanding read.
    pub async fn press(&mut self, digits: &str) -> &TurnReply {
        self.send(Some(digits.to_string()), false).await
    }

    /// Presses each entry in order, returning the reply to the last one.
    pub async fn press_all(&mut self, inputs: &[&str]) -> &TurnReply {
        for input in inputs {
            self.send(Some(input.to_string()), false).await;
        }
        self.last()
    }

    pub async fn hang_up(&mut self) -> &TurnReply {
        self.send(None, true).await
    }

    pub fn last(&self) -> &TurnReply {
        self.last.as_ref().expect("no turn sent yet")
    }

    async fn send(&mut self, digits: Option<String>, hangup: bool) -> &TurnReply {
        let reply = self
            .manager
            .handle_turn(TurnRequest {
                call_id: self.call_id.clone(),
                caller: self.caller.clone(),
                called: self.called.clone(),
                digits,
                hangup,
            })
            .await;
        self.last.insert(reply)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Assertion helpers on a gateway reply.
pub trait ReplyExt {
    fn assert_prompt(&self, prompt: &str) -> &Self;
    fn assert_messages(&self, messages: &[&str]) -> &Self;
    fn assert_hangup(&self, last_message: &str) -> &Self;
}

impl ReplyExt for TurnReply {
    fn assert_prompt(&self, prompt: &str) -> &Self {
        assert_eq!(self.prompt(), Some(prompt), "unexpected reply: {:?}", self);
        self
    }

    fn assert_messages(&self, messages: &[&str]) -> &Self {
        assert_eq!(self.messages(), messages, "unexpected reply: {:?}", self);
        self
    }

    fn assert_hangup(&self, last_message: &str) -> &Self {
        assert!(self.is_hangup(), "expected hangup, got {:?}", self);
        assert_eq!(
            self.messages().last().map(String::as_str),
            Some(last_message),
            "unexpected reply: {:?}",
            self
        );
        self
    }
}
