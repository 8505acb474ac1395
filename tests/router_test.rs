//! Integration tests for SemanticRouter: scoring, thresholds, registration, suggestions.

mod common;

use std::sync::Arc;

use common::{CannedCompletion, MapEmbedder};
use maitre::{MaitreError, ScoringConfig, SemanticRouter, ToolDefinition};

/// Unit vector at cosine `c` from `[1, 0]`.
fn at_cosine(c: f32) -> Vec<f32> {
    vec![c, (1.0 - c * c).sqrt()]
}

fn router_with(entries: Vec<(&str, Vec<f32>)>) -> (tempfile::TempDir, SemanticRouter) {
    let embedder = Arc::new(MapEmbedder::new(entries));
    let (tmp, cache) = common::manager(embedder);
    (tmp, SemanticRouter::new(cache, ScoringConfig::default()))
}

fn no_vectors() -> MapEmbedder {
    MapEmbedder::new(Vec::<(String, Vec<f32>)>::new())
}

fn booking_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new("create_booking", "Đặt bàn mới")
            .with_parameters(["customerName", "numberOfGuests", "bookingTime"])
            .with_service("BookingService"),
        ToolDefinition::new("update_booking", "Cập nhật đặt bàn")
            .with_parameters(["bookingId", "numberOfGuests"])
            .with_service("BookingService"),
        ToolDefinition::new("show_menu", "Thực đơn hôm nay").with_service("MenuService"),
    ]
}

#[tokio::test]
async fn confidence_floor() {
    let (_tmp, router) = router_with(vec![
        ("menu hôm nay", vec![1.0, 0.0]),
        ("Món chính", at_cosine(0.59)),
        ("Món tráng miệng", at_cosine(0.6)),
    ]);
    let low = vec![ToolDefinition::new("main_dishes", "Món chính")];
    let high = vec![ToolDefinition::new("desserts", "Món tráng miệng")];
    let mut all = low.clone();
    all.extend(high.clone());
    router.rebuild(all).await.unwrap();

    assert!(router.match_utterance("menu hôm nay", &low).await.is_none());

    let matched = router.match_utterance("menu hôm nay", &high).await.unwrap();
    assert_eq!(matched.tool.name, "desserts");
    assert_eq!(matched.confidence, 0.6);
}

#[tokio::test]
async fn threshold_applies_to_raw_score() {
    let (_tmp, router) = router_with(vec![
        ("menu hôm nay", vec![1.0, 0.0]),
        ("Đồ uống", at_cosine(0.6004)),
        ("Khai vị", at_cosine(0.5996)),
    ]);
    let drinks = vec![ToolDefinition::new("drinks", "Đồ uống")];
    let starters = vec![ToolDefinition::new("starters", "Khai vị")];
    router
        .rebuild(vec![drinks[0].clone(), starters[0].clone()])
        .await
        .unwrap();

    let matched = router.match_utterance("menu hôm nay", &drinks).await.unwrap();
    assert_eq!(matched.confidence, 0.6);
    // Rounds to 0.6 but the score itself is below the threshold
    assert!(router.match_utterance("menu hôm nay", &starters).await.is_none());
}

#[tokio::test]
async fn non_positive_scores_can_win_under_low_threshold() {
    let embedder = Arc::new(MapEmbedder::new([
        ("menu hôm nay", vec![1.0f32, 0.0]),
        ("Trái chiều", vec![-0.5f32, 0.866]),
    ]));
    let (_tmp, cache) = common::manager(embedder);
    let router = SemanticRouter::new(cache, ScoringConfig::new().threshold(-0.9));
    let tools = vec![ToolDefinition::new("opposite", "Trái chiều")];
    router.rebuild(tools.clone()).await.unwrap();

    let matched = router.match_utterance("menu hôm nay", &tools).await.unwrap();
    assert_eq!(matched.tool.name, "opposite");
    assert_eq!(matched.confidence, -0.5);
}

#[tokio::test]
async fn directional_booking_tie_break() {
    let same = vec![1.0f32, 0.0];
    let (_tmp, router) = router_with(vec![
        ("Đặt bàn mới", same.clone()),
        ("Cập nhật đặt bàn", same.clone()),
        ("Thực đơn hôm nay", vec![0.0, 1.0]),
        ("đặt bàn cho 4 người", same.clone()),
        ("đổi booking 12 sang 6 người", same.clone()),
    ]);
    let tools = booking_tools();
    router.rebuild(tools.clone()).await.unwrap();

    let create = router
        .match_utterance("đặt bàn cho 4 người", &tools)
        .await
        .unwrap();
    assert_eq!(create.tool.name, "create_booking");
    assert_eq!(create.confidence, 1.3);

    let update = router
        .match_utterance("đổi booking 12 sang 6 người", &tools)
        .await
        .unwrap();
    assert_eq!(update.tool.name, "update_booking");
    assert_eq!(update.confidence, 1.2);

    let skeleton = update.parameter_skeleton();
    assert_eq!(skeleton.len(), 2);
    assert!(skeleton["bookingId"].is_null());
}

#[tokio::test]
async fn ties_keep_first_candidate() {
    let same = vec![0.8f32, 0.6];
    let (_tmp, router) = router_with(vec![
        ("chào", vec![1.0, 0.0]),
        ("Một", same.clone()),
        ("Hai", same.clone()),
    ]);
    let tools = vec![
        ToolDefinition::new("first", "Một"),
        ToolDefinition::new("second", "Hai"),
    ];
    router.rebuild(tools.clone()).await.unwrap();

    let matched = router.match_utterance("chào", &tools).await.unwrap();
    assert_eq!(matched.tool.name, "first");

    let reversed: Vec<_> = tools.into_iter().rev().collect();
    let matched = router.match_utterance("chào", &reversed).await.unwrap();
    assert_eq!(matched.tool.name, "second");
}

#[tokio::test]
async fn unmatchable_inputs_give_none() {
    let (_tmp, router) = router_with(vec![
        ("Đặt bàn mới", vec![1.0, 0.0]),
        ("Cập nhật đặt bàn", vec![1.0, 0.0]),
        ("Thực đơn hôm nay", vec![0.0, 1.0]),
        ("ba chiều", vec![1.0, 0.0, 0.0]),
    ]);
    let tools = booking_tools();
    router.rebuild(tools.clone()).await.unwrap();

    assert!(router.match_utterance("   ", &tools).await.is_none());
    assert!(router.match_utterance("đặt bàn", &[]).await.is_none());
    // Embedding service has no vector for this text
    assert!(router.match_utterance("không biết", &tools).await.is_none());
    // Dimension mismatch with every tool
    assert!(router.match_utterance("ba chiều", &tools).await.is_none());
    // Candidate never registered
    let stranger = vec![ToolDefinition::new("order_food", "Gọi món")];
    assert!(router.match_utterance("Đặt bàn mới", &stranger).await.is_none());
}

#[tokio::test]
async fn rebuild_reports_duplicates_and_gaps() {
    let (_tmp, router) = router_with(vec![
        ("Hiển thị thực đơn. cho xem menu", vec![1.0, 0.0]),
        ("Xóa món", vec![0.0, 1.0]),
    ]);
    let summary = router
        .rebuild(vec![
            ToolDefinition::new("show_menu", "Hiển thị thực đơn").with_example("cho xem menu"),
            ToolDefinition::new("show_menu", "Bản sao"),
            ToolDefinition::new("delete_item", "Xóa món"),
            ToolDefinition::new("ping", ""),
            ToolDefinition::new("unknown", "Không có vector"),
        ])
        .await
        .unwrap();

    assert_eq!(summary.registered, 4);
    assert_eq!(summary.embedded, 2);
    assert_eq!(summary.duplicates, vec!["show_menu".to_string()]);
    assert_eq!(summary.without_text, vec!["ping".to_string()]);
    assert_eq!(summary.failed, vec!["unknown".to_string()]);
    assert_eq!(
        router.tool("show_menu").unwrap().description,
        "Hiển thị thực đơn"
    );
    assert_eq!(router.tools().len(), 4);
}

#[tokio::test]
async fn empty_registry_is_an_error_and_keeps_old_table() {
    let (_tmp, router) = router_with(vec![("Đặt bàn mới", vec![1.0, 0.0])]);
    router
        .rebuild(vec![ToolDefinition::new("create_booking", "Đặt bàn mới")])
        .await
        .unwrap();

    let result = router.rebuild(vec![ToolDefinition::new("ping", "")]).await;
    assert!(matches!(result, Err(MaitreError::EmptyRegistry)));
    assert!(router.rebuild(Vec::new()).await.is_err());
    assert!(router.tool("create_booking").is_some());
}

#[tokio::test]
async fn tools_for_service_filters_registry() {
    let (_tmp, router) = router_with(vec![
        ("Đặt bàn mới", vec![1.0, 0.0]),
        ("Cập nhật đặt bàn", vec![1.0, 0.0]),
        ("Thực đơn hôm nay", vec![0.0, 1.0]),
    ]);
    router.rebuild(booking_tools()).await.unwrap();

    let names: Vec<String> = router
        .tools_for_service("BookingService")
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["create_booking", "update_booking"]);
    assert!(router.tools_for_service("PaymentService").is_empty());
}

#[tokio::test]
async fn suggestion_is_validated_against_candidates() {
    let tools = booking_tools();
    let cases = [
        ("\"show_menu\".", Some("show_menu")),
        ("  create_booking\n", Some("create_booking")),
        ("None", None),
        ("book_table", None),
    ];
    for (answer, expected) in cases {
        let (_tmp, cache) = common::manager(Arc::new(no_vectors()));
        let provider = Arc::new(CannedCompletion::answering(answer));
        let router = SemanticRouter::new(cache, ScoringConfig::default())
            .with_suggester(provider.clone(), common::fast_retry());

        let suggested = router.match_by_suggestion("tôi muốn đặt bàn", &tools).await;
        assert_eq!(suggested.as_deref(), expected, "answer {answer:?}");
        assert_eq!(provider.calls(), 1);
    }
}

#[tokio::test]
async fn suggestion_failures_give_none() {
    let tools = booking_tools();
    let (_tmp, cache) = common::manager(Arc::new(no_vectors()));

    let without = SemanticRouter::new(cache.clone(), ScoringConfig::default());
    assert!(without.match_by_suggestion("đặt bàn", &tools).await.is_none());

    let provider = Arc::new(CannedCompletion::failing());
    let router = SemanticRouter::new(cache, ScoringConfig::default())
        .with_suggester(provider.clone(), common::fast_retry());
    assert!(router.match_by_suggestion("đặt bàn", &tools).await.is_none());
    // Authentication failures are not retried
    assert_eq!(provider.calls(), 1);

    assert!(router.match_by_suggestion("đặt bàn", &[]).await.is_none());
    assert_eq!(provider.calls(), 1);
}
