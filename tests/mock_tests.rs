use palaver::stats::{MockStats, StatProvider};

#[test]
fn seeded_generator_is_reproducible() {
    let a = MockStats::seeded(42).get_stats(7).unwrap();
    let b = MockStats::seeded(42).get_stats(7).unwrap();
    assert_eq!(
        serde_json::to_value(&a).unwrap(),
        serde_json::to_value(&b).unwrap()
    );
}

#[test]
fn different_seeds_differ() {
    let a = MockStats::seeded(1).get_stats(7).unwrap();
    let b = MockStats::seeded(2).get_stats(7).unwrap();
    assert_ne!(
        serde_json::to_value(&a.metrics).unwrap(),
        serde_json::to_value(&b.metrics).unwrap()
    );
}

#[test]
fn metrics_are_internally_consistent() {
    let stats = MockStats::seeded(7).get_stats(7).unwrap();
    let m = &stats.metrics;

    assert!((50..=500).contains(&m.total_users));
    assert!((500..=5000).contains(&m.total_messages));
    assert!(m.active_today >= 5);
    assert!(m.active_today <= m.total_users.min(50));
    assert!(m.avg_message_length >= 50.0 && m.avg_message_length < 150.0);
}

#[test]
fn charts_cover_the_requested_window() {
    let stats = MockStats::seeded(7).get_stats(7).unwrap();
    assert_eq!(stats.activity_chart.len(), 7);
    assert_eq!(stats.chart_data.len(), 7);

    // ascending consecutive dates, ending today
    assert!(stats
        .activity_chart
        .windows(2)
        .all(|w| w[0].date < w[1].date));
    let today = chrono::Utc::now().date_naive().to_string();
    assert_eq!(stats.activity_chart.last().unwrap().date, today);

    let narrow = MockStats::seeded(7).get_stats(3).unwrap();
    assert_eq!(narrow.activity_chart.len(), 3);
}

#[test]
fn charts_respect_the_shape_caps() {
    let stats = MockStats::seeded(7).get_stats(90).unwrap();
    assert_eq!(stats.activity_chart.len(), 30);
    assert_eq!(stats.chart_data.len(), 90);
}

#[test]
fn recent_messages_match_the_dashboard_contract() {
    let stats = MockStats::seeded(7).get_stats(7).unwrap();
    let recent = &stats.recent_messages;

    assert_eq!(recent.len(), 10);
    for (i, msg) in recent.iter().enumerate() {
        assert!(msg.preview.chars().count() <= 100);
        assert!((100_000_000..=999_999_999).contains(&msg.telegram_id));
        let expected = if i % 2 == 0 {
            palaver::db::Role::User
        } else {
            palaver::db::Role::Assistant
        };
        assert_eq!(msg.role, expected);
    }
    // timestamps run newest-first like the real provider's output
    assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
}
