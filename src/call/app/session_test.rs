//! Tests for the turn driver.
//!
//! Uses [`MockGateway`] for full calls and a few throwaway apps to poke at
//! the controller's own guarantees.

#[cfg(test)]
mod tests {
    use crate::call::app::testing::*;
    use crate::call::app::{
        AppAction, ApplicationContext, CallApp, CallController, CallInfo, CallSessionManager,
        TurnReply, TurnRequest,
    };
    use crate::store::MemoryStore;
    use crate::texts::TextCatalog;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Ends its first step without registering a read.
    struct ForgetfulApp;

    #[async_trait]
    impl CallApp for ForgetfulApp {
        fn name(&self) -> &str {
            "forgetful"
        }

        fn current_step(&self) -> String {
            "start".to_string()
        }

        async fn on_enter(
            &mut self,
            _controller: &mut CallController,
            _context: &ApplicationContext,
        ) -> anyhow::Result<AppAction> {
            Ok(AppAction::Continue)
        }

        async fn on_input(
            &mut self,
            _digits: String,
            _controller: &mut CallController,
            _context: &ApplicationContext,
        ) -> anyhow::Result<AppAction> {
            Ok(AppAction::Hangup)
        }
    }

    fn turn(call_id: &str, digits: Option<&str>) -> TurnRequest {
        TurnRequest {
            call_id: call_id.to_string(),
            caller: SEMINAR_PHONE.to_string(),
            called: LINE.to_string(),
            digits: digits.map(str::to_string),
            hangup: false,
        }
    }

    #[tokio::test]
    async fn test_first_turn_enters_flow() {
        let mut gw = MockGateway::new();
        gw.dial(SEMINAR_PHONE)
            .await
            .assert_messages(&["welcome"])
            .assert_prompt("choose_date_mode");
        assert_eq!(gw.manager.active_count().await, 1);

        let sessions = gw.manager.list_sessions().await;
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].call_id, "call-1");
        assert_eq!(sessions[0].app, "teacher-report");
        assert_eq!(sessions[0].step, "choose_mode");
        assert_eq!(sessions[0].turns, 1);
    }

    #[tokio::test]
    async fn test_unknown_line() {
        let mut gw = MockGateway::new();
        gw.dial_with(SEMINAR_PHONE, "0739999999", None)
            .await
            .assert_hangup("line_not_configured");
        assert_eq!(gw.manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_constraint_violation_repeats_prompt() {
        let mut gw = MockGateway::new();
        gw.dial(SEMINAR_PHONE).await;
        gw.press("9")
            .await
            .assert_messages(&["invalid_input"])
            .assert_prompt("choose_date_mode");
        gw.press("")
            .await
            .assert_messages(&["invalid_input"])
            .assert_prompt("choose_date_mode");
        gw.press("1").await.assert_prompt("confirm_date");
        gw.press("1").await.assert_prompt("prompt_how_many_lessons");
        for bad in ["123", "1a", "*"] {
            gw.press(bad)
                .await
                .assert_messages(&["invalid_input"])
                .assert_prompt("prompt_how_many_lessons");
        }
        match gw.last() {
            TurnReply::Read { constraints, .. } => {
                assert_eq!(constraints.min_digits, 1);
                assert_eq!(constraints.max_digits, 2);
            }
            other => panic!("expected read, got {:?}", other),
        }
        gw.press("12")
            .await
            .assert_prompt("prompt_how_many_watch_or_individual");
    }

    #[tokio::test]
    async fn test_remote_hangup_drops_session() {
        let mut gw = MockGateway::new();
        gw.dial(SEMINAR_PHONE).await;
        gw.press_all(&["1", "1", "5"]).await;
        assert_eq!(gw.manager.active_count().await, 1);

        let reply = gw.hang_up().await;
        assert_eq!(reply, &TurnReply::Hangup { messages: vec![] });
        assert_eq!(gw.manager.active_count().await, 0);
        assert!(gw.store.reports().await.is_empty());

        // a hangup for a call we never saw is harmless
        let reply = gw.hang_up().await;
        assert!(reply.is_hangup());
    }

    #[tokio::test]
    async fn test_kill_session() {
        let mut gw = MockGateway::new();
        gw.dial(SEMINAR_PHONE).await;
        assert!(gw.manager.kill("call-1").await);
        assert!(!gw.manager.kill("call-1").await);
        assert_eq!(gw.manager.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = Arc::new(MemoryStore::new(fixtures()));
        let manager = CallSessionManager::new(
            store,
            Arc::new(TextCatalog::empty()),
            Arc::new(test_config()),
        )
        .unwrap()
        .with_clock(Box::new(test_now));

        let a = manager.handle_turn(turn("a", None)).await;
        let b = manager.handle_turn(turn("b", None)).await;
        assert_eq!(a.prompt(), Some("choose_date_mode"));
        assert_eq!(b.prompt(), Some("choose_date_mode"));

        let a = manager.handle_turn(turn("a", Some("2"))).await;
        assert_eq!(a.prompt(), Some("enter_date"));
        let b = manager.handle_turn(turn("b", Some("1"))).await;
        assert_eq!(b.prompt(), Some("confirm_date"));
        assert_eq!(manager.active_count().await, 2);
    }

    #[tokio::test]
    async fn test_prune_idle() {
        let offset = Arc::new(AtomicI64::new(0));
        let clock_offset = offset.clone();
        let manager = CallSessionManager::new(
            Arc::new(MemoryStore::new(fixtures())),
            Arc::new(TextCatalog::empty()),
            Arc::new(test_config()),
        )
        .unwrap()
        .with_clock(Box::new(move || {
            test_now() + chrono::Duration::seconds(clock_offset.load(Ordering::SeqCst))
        }));

        manager.handle_turn(turn("old", None)).await;
        offset.store(600, Ordering::SeqCst);
        manager.handle_turn(turn("new", None)).await;
        offset.store(1000, Ordering::SeqCst);

        assert_eq!(manager.prune_idle(Duration::from_secs(900)).await, 1);
        let remaining = manager.list_sessions().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].call_id, "new");
        assert_eq!(manager.prune_idle(Duration::from_secs(900)).await, 0);
    }

    #[tokio::test]
    async fn test_step_without_prompt_is_an_error() {
        let manager = CallSessionManager::new(
            Arc::new(MemoryStore::new(fixtures())),
            Arc::new(TextCatalog::empty()),
            Arc::new(test_config()),
        )
        .unwrap()
        .with_app_factory(Box::new(|_: &CallInfo| {
            Box::new(ForgetfulApp) as Box<dyn CallApp>
        }));

        let reply = manager.handle_turn(turn("x", None)).await;
        assert_eq!(
            reply,
            TurnReply::Hangup {
                messages: vec!["system_error".to_string()]
            }
        );
        assert_eq!(manager.active_count().await, 0);
    }
}
