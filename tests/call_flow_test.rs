use chrono::{TimeZone, Utc};
use std::sync::Arc;
use teacher_report_ivr::call::app::{CallSessionManager, TurnReply, TurnRequest};
use teacher_report_ivr::config::{Config, StoreConfig};
use teacher_report_ivr::store::{MemoryStore, ReportStore};
use teacher_report_ivr::texts::TextCatalog;

const LINE: &str = "0730001111";

fn fixtures_path() -> String {
    format!("{}/config/fixtures.toml", env!("CARGO_MANIFEST_DIR"))
}

async fn manager(store: Arc<MemoryStore>) -> CallSessionManager {
    CallSessionManager::new(
        store,
        Arc::new(TextCatalog::builtin().unwrap()),
        Arc::new(Config::default()),
    )
    .unwrap()
    // Thursday 15 October 2026, noon in Jerusalem
    .with_clock(Box::new(|| Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap()))
}

struct Call<'a> {
    manager: &'a CallSessionManager,
    call_id: &'a str,
    caller: &'a str,
    called: &'a str,
}

impl Call<'_> {
    async fn turn(&self, digits: Option<&str>) -> TurnReply {
        self.manager
            .handle_turn(TurnRequest {
                call_id: self.call_id.to_string(),
                caller: self.caller.to_string(),
                called: self.called.to_string(),
                digits: digits.map(str::to_string),
                hangup: false,
            })
            .await
    }
}

#[tokio::test]
async fn test_sample_config_loads() {
    let path = format!("{}/teacher-report-ivr.toml", env!("CARGO_MANIFEST_DIR"));
    let config = Config::load(&path).unwrap();
    assert_eq!(config.timezone, "Asia/Jerusalem");
    assert!(matches!(config.store, StoreConfig::Memory { .. }));
    assert!(config.tz().is_ok());
}

#[tokio::test]
async fn test_full_call_with_builtin_texts() {
    let store = Arc::new(MemoryStore::open(Some(fixtures_path().as_str()), None).await.unwrap());
    let manager = manager(store.clone()).await;
    let call = Call {
        manager: &manager,
        call_id: "it-1",
        caller: "0521110001",
        called: LINE,
    };

    let reply = call.turn(None).await;
    assert_eq!(reply.messages(), ["Hello Rivka Levi."]);
    assert!(reply.prompt().unwrap().contains("staff meeting"));

    // survey answer, then today
    call.turn(Some("1")).await;
    let reply = call.turn(Some("1")).await;
    let prompt = reply.prompt().unwrap();
    assert!(prompt.contains("Thursday"), "{}", prompt);
    assert!(prompt.contains("15/10/2026"), "{}", prompt);

    for digits in ["1", "6", "1", "2", "2", "0", "1"] {
        let reply = call.turn(Some(digits)).await;
        assert!(!reply.is_hangup(), "{:?}", reply);
    }
    let reply = call.turn(Some("1")).await;
    assert!(matches!(reply, TurnReply::Read { .. }), "{:?}", reply);
    let reply = call.turn(Some("2")).await;
    assert!(reply.is_hangup());

    let reports = store.reports().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].fields.how_many_lessons, Some(6));
    assert_eq!(reports[0].fields.was_kamal, Some(false));

    let answers = store.find_answers(1, 1).await.unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].report_id, Some(reports[0].id));
}

#[tokio::test]
async fn test_maintenance_organization() {
    let store = Arc::new(MemoryStore::open(Some(fixtures_path().as_str()), None).await.unwrap());
    let manager = manager(store).await;
    let call = Call {
        manager: &manager,
        call_id: "it-2",
        caller: "0521110001",
        called: "0730002222",
    };
    let reply = call.turn(None).await;
    assert!(reply.is_hangup());
    assert_eq!(
        reply.messages(),
        ["The reporting line is closed for the holidays."]
    );
}
