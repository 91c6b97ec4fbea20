use crate::harness::{Assertion, Scenario};
use chrono::{Local, TimeZone, Utc};

/// `HH:MM` local time of a UTC instant on 2026-02-01
fn local_time(hour: u32, minute: u32) -> String {
    Utc.with_ymd_and_hms(2026, 2, 1, hour, minute, 0)
        .unwrap()
        .with_timezone(&Local)
        .format("%H:%M")
        .to_string()
}

#[test]
fn test_record_creates_then_updates() {
    Scenario::new("record")
        .record("a1b2c3d4")
        .assert_session_count(1)
        .assert(Assertion::Custom(Box::new(|store| {
            let found = store
                .find_session("a1b2c3d4", true)
                .ok_or_else(|| anyhow::anyhow!("recorded session not found"))?;
            let detail = found
                .detail
                .ok_or_else(|| anyhow::anyhow!("no content"))?;
            let meta = &detail.metadata;
            anyhow::ensure!(
                meta.title.as_deref().unwrap_or_default().starts_with("Session: "),
                "unexpected title {:?}",
                meta.title
            );
            anyhow::ensure!(meta.started.as_deref() == Some(local_time(9, 0).as_str()));
            anyhow::ensure!(meta.last_updated == meta.started);
            Ok(())
        })))
        .wait(std::time::Duration::from_secs(60))
        .record("a1b2c3d4")
        .assert_session_count(1)
        .assert(Assertion::Custom(Box::new(|store| {
            let found = store
                .find_session("a1b2c3d4", true)
                .ok_or_else(|| anyhow::anyhow!("recorded session not found"))?;
            let detail = found
                .detail
                .ok_or_else(|| anyhow::anyhow!("no content"))?;
            let meta = &detail.metadata;
            anyhow::ensure!(meta.started.as_deref() == Some(local_time(9, 0).as_str()));
            anyhow::ensure!(meta.last_updated.as_deref() == Some(local_time(9, 1).as_str()));
            Ok(())
        })))
        .run()
        .unwrap();
}

#[test]
fn test_short_fallback_id_is_found_by_recent_and_path() {
    Scenario::new("short_fallback_id")
        .record("myproj")
        // Too short to list or look up by id
        .assert_session_count(0)
        .assert_not_found("myproj")
        .assert(Assertion::RecentCount { days: 7, count: 1 })
        .assert(Assertion::Custom(Box::new(|store| {
            let recent = store.repository().recent(7);
            let path = &recent[0].path;
            anyhow::ensure!(
                recent[0].filename.ends_with("-myproj-session.tmp"),
                "recent: {:?}",
                recent[0].filename
            );

            let found = store
                .find_session(&path.to_string_lossy(), true)
                .ok_or_else(|| anyhow::anyhow!("not found by path"))?;
            let title = found
                .detail
                .and_then(|d| d.metadata.title)
                .unwrap_or_default();
            anyhow::ensure!(title.starts_with("Session: "), "title {:?}", title);
            Ok(())
        })))
        .wait_days(8)
        .assert(Assertion::RecentCount { days: 7, count: 0 })
        .run()
        .unwrap();
}

#[test]
fn test_record_rejects_path_like_id() {
    Scenario::new("path_like_id")
        .assert(Assertion::Custom(Box::new(|store| {
            let err = store
                .repository()
                .record("../../x")
                .err()
                .ok_or_else(|| anyhow::anyhow!("path-like id was accepted"))?;
            anyhow::ensure!(err.is_validation(), "unexpected error {}", err);
            anyhow::ensure!(
                !store.repository().dir().exists(),
                "sessions directory was created"
            );
            let escaped = store.root().parent().map(|p| p.join("x-session.tmp"));
            anyhow::ensure!(
                escaped.map_or(true, |p| !p.exists()),
                "file written outside the store"
            );
            Ok(())
        })))
        .run()
        .unwrap();
}
