#![allow(clippy::expect_used, clippy::unwrap_used)]

//! End-to-end checks of the pure pipeline: classify, group, flatten,
//! truncate, render.

use joblog_core::{
    classify_text, flatten, group_lines, parse_annotations, AnnotationLevel, ExpansionState,
    LineKind, LogView, RenderItem, TruncationConfig, TruncationWindow,
};

const SETUP_LOG: &str = "2025-01-01T00:00:00.000Z ##[group]Setup\n\
2025-01-01T00:00:00.100Z step one\n\
2025-01-01T00:00:00.200Z ##[endgroup]\n\
2025-01-01T00:00:00.300Z done\n";

#[test]
fn setup_group_then_standalone_line() {
    let lines = classify_text(SETUP_LOG);
    let groups = group_lines(&lines);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, "Setup");
    assert_eq!(groups[0].lines.len(), 1);
    assert_eq!(groups[0].lines[0].content, "step one");
    assert_eq!(groups[0].lines[0].level, 1);
    assert_eq!(
        groups[0].lines[0].timestamp.as_deref(),
        Some("2025-01-01T00:00:00.100Z")
    );

    assert!(groups[1].name.is_empty());
    assert_eq!(groups[1].lines.len(), 1);
    assert_eq!(groups[1].lines[0].content, "done");
    assert_eq!(groups[1].lines[0].level, 0);

    let snapshot = LogView::default().snapshot(SETUP_LOG);
    assert_eq!(snapshot.plan.omitted, 0);
}

#[test]
fn excessive_closers_never_go_negative() {
    let text = "##[endgroup]\n##[endgroup]\n##[group]a\nx\n##[endgroup]\n##[endgroup]\ny";
    let lines = classify_text(text);
    assert!(lines.iter().all(|line| line.level <= 1));
    let last = lines.last().unwrap();
    assert_eq!(last.content, "y");
    assert_eq!(last.level, 0);
}

#[test]
fn realistic_job_log_renders_with_annotations() {
    let text = [
        "2025-01-01T00:00:00.0000000Z ##[group]Run cargo test",
        "2025-01-01T00:00:00.1000000Z ##[command]cargo test --workspace",
        "2025-01-01T00:00:01.0000000Z \x1b[1m\x1b[32m   Compiling\x1b[0m joblog v0.1.0",
        "2025-01-01T00:00:02.0000000Z warning: unused variable `x`",
        "2025-01-01T00:00:03.0000000Z ::error file=src/lib.rs,line=42,endLine=44::assertion failed: left == right",
        "2025-01-01T00:00:03.1000000Z ##[endgroup]",
        "2025-01-01T00:00:03.2000000Z ##[error]Process completed with exit code 101.",
    ]
    .join("\n");

    let lines = classify_text(&text);
    let kinds: Vec<LineKind> = lines.iter().map(|line| line.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LineKind::GroupStart,
            LineKind::Command,
            LineKind::Regular,
            LineKind::Warning,
            LineKind::Error,
            LineKind::GroupEnd,
            LineKind::Error,
        ]
    );

    let annotations = parse_annotations(&text);
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations[0].annotation_level, AnnotationLevel::Failure);
    assert_eq!(annotations[0].path.as_deref(), Some("src/lib.rs"));
    assert_eq!(annotations[0].start_line, Some(42));
    assert_eq!(annotations[0].end_line, Some(44));
    assert_eq!(annotations[0].title.as_deref(), Some("assertion failed"));
    assert_eq!(annotations[0].line, 4);
    assert_eq!(annotations[1].line, 6);

    let mut view = LogView::default();
    let collapsed = view.snapshot(&text);
    assert_eq!(collapsed.items.len(), 2);

    let row = view.jump_to_line(&text, annotations[0].line).unwrap();
    let expanded = view.snapshot(&text);
    match &expanded.items[row] {
        RenderItem::Line { line, .. } => assert_eq!(line.index, 4),
        other => panic!("unexpected row {other:?}"),
    }

    let RenderItem::Line { line, .. } = &expanded.items[2] else {
        panic!("expected compile line");
    };
    let segments = expanded.render_line(line);
    assert_eq!(segments[0].text, "   Compiling");
    assert!(segments[0].style.bold);
    assert_eq!(segments[1].text, " joblog v0.1.0");
    assert!(segments[1].style.is_plain());
}

#[test]
fn truncation_reports_exact_head_and_tail() {
    let text: String = (0..50).map(|i| format!("row {i}\n")).collect();
    let mut groups = group_lines(&classify_text(&text));
    ExpansionState::new().apply(&mut groups);
    let items = flatten(&groups);
    assert_eq!(items.len(), 50);

    let mut window = TruncationWindow::new(TruncationConfig {
        max_items: 20,
        head: 5,
        tail: 7,
    });
    let plan = window.plan(items.len());
    assert_eq!(plan.omitted, 50 - 5 - 7);
    let visible: Vec<usize> = plan.visible_indices().collect();
    assert_eq!(visible[..5], [0, 1, 2, 3, 4]);
    assert_eq!(visible[5..], [43, 44, 45, 46, 47, 48, 49]);

    for index in 5..43 {
        let mut probe = window.clone();
        assert!(probe.request_focus(index, items.len()), "index {index}");
        assert!(probe.is_showing_all());
    }
    assert!(!window.request_focus(4, items.len()));
    assert!(!window.request_focus(43, items.len()));
}
