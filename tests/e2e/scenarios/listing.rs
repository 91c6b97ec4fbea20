use crate::harness::{Assertion, Scenario};
use chrono::NaiveDate;
use sesh_core::ListOptions;

fn fifteen_sessions() -> Scenario {
    (0..15).fold(Scenario::new("fifteen_sessions"), |scenario, i| {
        scenario.titled_session(
            &format!("2026-02-{:02}-sess{:04}-session.tmp", i + 1, i),
            &format!("Session {}", i),
        )
    })
}

fn labels(range: impl DoubleEndedIterator<Item = usize>) -> Vec<String> {
    range.rev().map(|i| format!("sess{:04}", i)).collect()
}

#[test]
fn test_pagination_newest_first() {
    fifteen_sessions()
        .assert_session_count(15)
        .assert(Assertion::ListPage {
            limit: 10,
            offset: 0,
            labels: labels(5..15),
            has_more: true,
        })
        .assert(Assertion::ListPage {
            limit: 10,
            offset: 10,
            labels: labels(0..5),
            has_more: false,
        })
        .assert(Assertion::ListPage {
            limit: 10,
            offset: 20,
            labels: vec![],
            has_more: false,
        })
        .run()
        .unwrap();
}

#[test]
fn test_filters() {
    fifteen_sessions()
        .assert(Assertion::Custom(Box::new(|store| {
            let by_id = store.repository().list(&ListOptions {
                search: Some("0001".into()),
                ..ListOptions::default()
            });
            anyhow::ensure!(by_id.total == 1, "search matched {}", by_id.total);

            let by_date = store.repository().list(&ListOptions {
                date: NaiveDate::from_ymd_opt(2026, 2, 3),
                ..ListOptions::default()
            });
            anyhow::ensure!(by_date.total == 1, "date matched {}", by_date.total);
            anyhow::ensure!(
                by_date.sessions[0].short_id() == Some("sess0002"),
                "wrong session for date filter"
            );
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_prefix_lookup_prefers_newest() {
    fifteen_sessions()
        .assert_finds("sess0003", "2026-02-04-sess0003-session.tmp")
        // Matches sess0000..sess0009; the newest wins
        .assert_finds("sess000", "2026-02-10-sess0009-session.tmp")
        .assert_finds(
            "2026-02-01-sess0000-session",
            "2026-02-01-sess0000-session.tmp",
        )
        .assert_not_found("zzzz")
        .assert_not_found("")
        .run()
        .unwrap();
}

#[test]
fn test_recent_window() {
    // Sessions are written hourly from 09:00, the last at 23:00
    fifteen_sessions()
        .assert(Assertion::RecentCount { days: 1, count: 15 })
        .wait_days(3)
        .assert(Assertion::RecentCount { days: 1, count: 0 })
        .assert(Assertion::RecentCount { days: 7, count: 15 })
        .wait_days(7)
        .assert(Assertion::RecentCount { days: 7, count: 0 })
        .run()
        .unwrap();
}

#[test]
fn test_configured_sessions_dir() {
    Scenario::new("configured_sessions_dir")
        .with_config("[store]\nsessions_dir = \"archive\"\n")
        .titled_session("2026-02-01-a1b2c3d4-session.tmp", "Archived")
        .assert_session_count(1)
        .assert(Assertion::Custom(Box::new(|store| {
            let found = store
                .find_session("a1b2c3d4", false)
                .ok_or_else(|| anyhow::anyhow!("session not found"))?;
            anyhow::ensure!(
                found.path.starts_with(store.root().join("archive")),
                "session stored at {}",
                found.path.display()
            );
            Ok(())
        })))
        .run()
        .unwrap();
}
