/// Integration tests for chart builds.
///
/// These tests drive the public API end to end: options or builder specs,
/// an in-memory source, and the datasets that come out.
use chart_prep::prelude::*;
use chart_prep::{RecordQuery, Transform};
use std::cell::RefCell;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Route pipeline logs to the captured test output (`RUST_LOG=chart_prep=debug`).
fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn day_chart() -> ChartSpec {
    ChartSpec::new("Visits", ReportType::GroupByDate, ChartType::Line, "d").with_period(Period::Day)
}

fn visits() -> MemorySource {
    MemorySource::new(vec![
        json!({"d": "2024-01-01"}),
        json!({"d": "2024-01-01"}),
        json!({"d": "2024-01-03"}),
    ])
}

fn orders() -> MemorySource {
    MemorySource::new(vec![
        json!({"id": 1, "created_at": "2024-01-03 10:00:00", "region": "eu", "status": "paid", "amount": 10.0}),
        json!({"id": 2, "created_at": "2024-01-20 11:30:00", "region": "us", "status": "paid", "amount": 25.5}),
        json!({"id": 3, "created_at": "2024-02-02 08:15:00", "region": "eu", "status": "open", "amount": 4.5}),
        json!({"id": 4, "created_at": "2024-04-11 17:45:00", "region": "eu", "status": "paid", "amount": 30.0}),
        json!({"id": 5, "created_at": "2024-04-12 09:00:00", "region": "us", "status": "refunded", "amount": 12.0}),
    ])
}

#[test]
fn test_count_by_day() {
    let datasets = build(&visits(), &day_chart()).unwrap();

    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].name, "");
    assert_eq!(datasets[0].color, "");
    let keys: Vec<&str> = datasets[0].keys().collect();
    assert_eq!(keys, vec!["2024-01-01", "2024-01-03"]);
    assert_eq!(datasets[0].get("2024-01-01"), Some(2.0));
    assert_eq!(datasets[0].get("2024-01-03"), Some(1.0));
}

#[test]
fn test_count_by_day_continuous() {
    init_tracing();
    let spec = day_chart().continuous_time(true);
    let datasets = build(&visits(), &spec).unwrap();

    let data: Vec<(&str, f64)> = datasets[0]
        .data
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    assert_eq!(
        data,
        vec![("2024-01-01", 2.0), ("2024-01-02", 0.0), ("2024-01-03", 1.0)]
    );
}

#[test]
fn test_relationship_absent_entity_uses_empty_key() {
    let spec = ChartSpec::new("Orders by country", ReportType::GroupByRelationship, ChartType::Pie, "country")
        .with_relationship("customer");
    let source = MemorySource::new(vec![
        json!({"id": 1, "customer": {"country": "FR"}}),
        json!({"id": 2, "customer": {"country": "DE"}}),
        json!({"id": 3, "customer": {"country": "FR"}}),
        json!({"id": 4, "customer": null}),
        json!({"id": 5}),
    ]);

    let datasets = build(&source, &spec).unwrap();
    let data = &datasets[0].data;
    assert_eq!(data.len(), 3);
    assert_eq!(data["FR"], 2.0);
    assert_eq!(data["DE"], 1.0);
    assert_eq!(data[""], 2.0);
}

#[test]
fn test_sum_with_missing_field_fails() {
    init_tracing();
    let spec = ChartSpec::new("Revenue", ReportType::GroupByString, ChartType::Bar, "region")
        .with_aggregate(AggregateFunction::Sum, "amount");
    let source = MemorySource::new(vec![
        json!({"region": "eu", "amount": 3}),
        json!({"region": "eu"}),
    ]);

    let err = build(&source, &spec).unwrap_err();
    assert!(matches!(err, ChartError::PipelineError { .. }));
    match err.cause() {
        ChartError::FieldError { field, .. } => assert_eq!(field, "amount"),
        other => panic!("expected field error, got {other:?}"),
    }
    assert!(err.to_string().contains("amount"));
}

#[test]
fn test_series_are_filtered_independently() {
    init_tracing();
    let spec = ChartSpec::new("Orders by month", ReportType::GroupByDate, ChartType::Line, "created_at")
        .with_period(Period::Month)
        .with_series(Series::new("Europe").with_condition("region = 'eu'").with_color("#0055a4"))
        .with_series(Series::new("Americas").with_condition("region = 'us'").with_color("#b22234"));

    let datasets = build(&orders(), &spec).unwrap();

    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[0].name, "Europe");
    assert_eq!(datasets[0].color, "#0055a4");
    assert_eq!(datasets[1].name, "Americas");

    let eu: Vec<(&str, f64)> = datasets[0].data.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(eu, vec![("2024-01", 1.0), ("2024-02", 1.0), ("2024-04", 1.0)]);
    let us: Vec<(&str, f64)> = datasets[1].data.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(us, vec![("2024-01", 1.0), ("2024-04", 1.0)]);
}

#[test]
fn test_series_condition_ignored_for_bar_charts() {
    let spec = ChartSpec::new("Orders", ReportType::GroupByString, ChartType::Bar, "region")
        .with_series(Series::new("Only EU?").with_condition("region = 'eu'"));

    let datasets = build(&orders(), &spec).unwrap();
    assert_eq!(datasets[0].get("eu"), Some(3.0));
    assert_eq!(datasets[0].get("us"), Some(2.0));
}

#[test]
fn test_scope_applies_to_bar_but_not_line_charts() {
    let bar = ChartSpec::new("Paid by region", ReportType::GroupByString, ChartType::Bar, "region")
        .with_scope(Predicate::raw("status = 'paid'"));
    let datasets = build(&orders(), &bar).unwrap();
    assert_eq!(datasets[0].get("eu"), Some(2.0));
    assert_eq!(datasets[0].get("us"), Some(1.0));

    let mut line = bar.clone();
    line.chart_type = ChartType::Line;
    let datasets = build(&orders(), &line).unwrap();
    assert_eq!(datasets[0].get("eu"), Some(3.0));
}

#[test]
fn test_callable_scope() {
    let spec = ChartSpec::new("Big orders", ReportType::GroupByString, ChartType::Pie, "region")
        .with_scope(Predicate::callable(|r| {
            r.field("amount").and_then(|v| v.as_f64()).is_some_and(|a| a >= 12.0)
        }));

    let datasets = build(&orders(), &spec).unwrap();
    assert_eq!(datasets[0].get("eu"), Some(1.0));
    assert_eq!(datasets[0].get("us"), Some(2.0));
}

#[test]
fn test_sum_and_avg() {
    let sum = ChartSpec::new("Revenue", ReportType::GroupByString, ChartType::Bar, "region")
        .with_aggregate(AggregateFunction::Sum, "amount");
    let datasets = build(&orders(), &sum).unwrap();
    assert_eq!(datasets[0].get("eu"), Some(44.5));
    assert_eq!(datasets[0].get("us"), Some(37.5));

    let avg = ChartSpec::new("Basket", ReportType::GroupByString, ChartType::Bar, "region")
        .with_aggregate(AggregateFunction::Avg, "amount");
    let datasets = build(&orders(), &avg).unwrap();
    assert_eq!(datasets[0].get("us"), Some(18.75));
}

#[test]
fn test_default_aggregate_is_count() {
    let implicit = ChartSpec::new("Orders", ReportType::GroupByString, ChartType::Bar, "status");
    let mut explicit = implicit.clone();
    explicit.aggregate_function = AggregateFunction::Count;

    assert_eq!(
        build(&orders(), &implicit).unwrap(),
        build(&orders(), &explicit).unwrap()
    );
}

#[test]
fn test_distinct_keeps_first_occurrence() {
    let spec = ChartSpec::new("Customers", ReportType::GroupByString, ChartType::Bar, "region")
        .with_aggregate(AggregateFunction::Sum, "amount")
        .with_distinct("customer_id");
    let source = MemorySource::new(vec![
        json!({"region": "eu", "customer_id": 7, "amount": 1}),
        json!({"region": "eu", "customer_id": 7, "amount": 100}),
        json!({"region": "eu", "customer_id": 8, "amount": 2}),
        json!({"region": "us", "customer_id": 7, "amount": 5}),
    ]);

    let datasets = build(&source, &spec).unwrap();
    assert_eq!(datasets[0].get("eu"), Some(3.0));
    assert_eq!(datasets[0].get("us"), Some(5.0));
}

#[test]
fn test_transform_runs_after_aggregation() {
    let spec = ChartSpec::new("Revenue (cents)", ReportType::GroupByString, ChartType::Bar, "region")
        .with_aggregate(AggregateFunction::Sum, "amount")
        .with_transform(Transform::new(|v| v * 100.0));

    let datasets = build(&orders(), &spec).unwrap();
    assert_eq!(datasets[0].get("eu"), Some(4450.0));
}

#[test]
fn test_empty_grouping_values_are_excluded() {
    let spec = ChartSpec::new("By status", ReportType::GroupByString, ChartType::Pie, "status");
    let source = MemorySource::new(vec![
        json!({"status": "paid"}),
        json!({"status": ""}),
        json!({"status": null}),
        json!({}),
    ]);

    let datasets = build(&source, &spec).unwrap();
    assert_eq!(datasets[0].data.len(), 1);
    assert_eq!(datasets[0].get("paid"), Some(1.0));
}

#[test]
fn test_week_buckets_use_iso_weeks() {
    let spec = ChartSpec::new("Weekly", ReportType::GroupByDate, ChartType::Line, "d")
        .with_period(Period::Week)
        .continuous_time(true);
    let source = MemorySource::new(vec![
        json!({"d": "2024-12-23"}),
        json!({"d": "2024-12-30"}),
        json!({"d": "2025-01-05"}),
        json!({"d": "2025-01-13"}),
    ]);

    let datasets = build(&source, &spec).unwrap();
    let data: Vec<(&str, f64)> = datasets[0].data.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(
        data,
        vec![
            ("2024-W52", 1.0),
            ("2025-W01", 2.0),
            ("2025-W02", 0.0),
            ("2025-W03", 1.0),
        ]
    );
}

#[test]
fn test_custom_date_format() {
    let spec = ChartSpec::new("Monthly", ReportType::GroupByDate, ChartType::Bar, "day")
        .with_period(Period::Month)
        .with_date_format("%d/%m/%Y");
    let source = MemorySource::new(vec![
        json!({"day": "31/01/2024"}),
        json!({"day": "01/02/2024"}),
    ]);
    let datasets = build(&source, &spec).unwrap();
    assert_eq!(datasets[0].get("2024-01"), Some(1.0));
    assert_eq!(datasets[0].get("2024-02"), Some(1.0));

    let bad = MemorySource::new(vec![json!({"day": "2024-02-01"})]);
    let err = build(&bad, &spec).unwrap_err();
    assert!(matches!(err.cause(), ChartError::ParseError { .. }));
}

#[test]
fn test_day_window_with_fixed_today() {
    let spec = ChartSpec::new("Recent", ReportType::GroupByString, ChartType::Bar, "region")
        .filter_days("created_at", 3);

    let datasets = ChartBuilder::new(&spec)
        .today(date(2024, 4, 13))
        .build(&orders())
        .unwrap();
    assert_eq!(datasets[0].get("eu"), Some(1.0));
    assert_eq!(datasets[0].get("us"), Some(1.0));
}

#[test]
fn test_period_window_starts_at_current_month() {
    let spec = ChartSpec::new("This month", ReportType::GroupByString, ChartType::Bar, "region")
        .filter_period("created_at", FilterPeriod::Month);

    let datasets = ChartBuilder::new(&spec)
        .today(date(2024, 1, 25))
        .build(&orders())
        .unwrap();
    // Records after "today" are not excluded by a period window.
    assert_eq!(datasets[0].get("eu"), Some(3.0));
    assert_eq!(datasets[0].get("us"), Some(2.0));

    let datasets = ChartBuilder::new(&spec)
        .today(date(2024, 4, 30))
        .build(&orders())
        .unwrap();
    assert_eq!(datasets[0].get("eu"), Some(1.0));
    assert_eq!(datasets[0].get("us"), Some(1.0));
}

#[test]
fn test_range_window_is_inclusive() {
    let spec = ChartSpec::new("Q1", ReportType::GroupByString, ChartType::Bar, "region")
        .filter_range("created_at", date(2024, 1, 20), date(2024, 2, 2));

    let datasets = build(&orders(), &spec).unwrap();
    assert_eq!(datasets[0].get("eu"), Some(1.0));
    assert_eq!(datasets[0].get("us"), Some(1.0));
}

#[test]
fn test_window_ignored_without_field() {
    let mut spec = ChartSpec::new("All", ReportType::GroupByString, ChartType::Bar, "region");
    spec.window.days = Some(1);

    let datasets = ChartBuilder::new(&spec)
        .today(date(2030, 1, 1))
        .build(&orders())
        .unwrap();
    assert_eq!(datasets[0].get("eu"), Some(3.0));
}

#[test]
fn test_build_is_idempotent() {
    let spec = ChartSpec::new("Orders by month", ReportType::GroupByDate, ChartType::Line, "created_at")
        .with_period(Period::Month)
        .with_aggregate(AggregateFunction::Avg, "amount")
        .continuous_time(true);
    let builder = ChartBuilder::new(&spec).today(date(2024, 5, 1));

    let first = builder.build(&orders()).unwrap();
    let second = builder.build(&orders()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].data.len(), 4);
    assert_eq!(first[0].get("2024-03"), Some(0.0));
}

#[test]
fn test_build_from_options() {
    init_tracing();
    let options = ChartOptions::from_json(
        r#"{
            "chart_title": "Paid orders by month",
            "report_type": "group_by_date",
            "chart_type": "line",
            "group_by_field": "created_at",
            "group_by_period": "month",
            "aggregate_function": "sum",
            "aggregate_field": "amount",
            "continuous_time": true,
            "conditions": [
                {"name": "Paid", "condition": "status = 'paid'", "color": "green"},
                {"name": "Not paid", "condition": "status != 'paid'", "color": "grey"}
            ]
        }"#,
    )
    .unwrap();
    let spec = ChartSpec::from_options(&options).unwrap();
    assert_eq!(spec.name, "paid_orders_by_month");

    let datasets = build(&orders(), &spec).unwrap();
    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[0].get("2024-01"), Some(35.5));
    assert_eq!(datasets[0].get("2024-02"), Some(0.0));
    assert_eq!(datasets[0].get("2024-04"), Some(30.0));
    assert_eq!(datasets[1].get("2024-02"), Some(4.5));
    assert_eq!(datasets[1].get("2024-03"), Some(0.0));
    assert_eq!(datasets[1].get("2024-04"), Some(12.0));
}

#[test]
fn test_dataset_serialization() {
    let datasets = build(&visits(), &day_chart()).unwrap();
    let value = serde_json::to_value(&datasets).unwrap();
    assert_eq!(
        value,
        json!([{"name": "", "color": "", "data": {"2024-01-01": 2.0, "2024-01-03": 1.0}}])
    );
}

/// A source that records the queries it receives.
struct RecordingSource {
    inner: MemorySource,
    queries: RefCell<Vec<RecordQuery>>,
}

impl RecordSource for RecordingSource {
    type Item = JsonValue;

    fn fetch(&self, query: &RecordQuery) -> ChartResult<Vec<JsonValue>> {
        self.queries.borrow_mut().push(query.clone());
        self.inner.fetch(query)
    }
}

#[test]
fn test_one_query_per_series() {
    let source = RecordingSource {
        inner: orders(),
        queries: RefCell::new(Vec::new()),
    };
    let spec = ChartSpec::new("Orders", ReportType::GroupByDate, ChartType::Line, "created_at")
        .with_series(Series::new("EU").with_condition("region = 'eu'"))
        .with_series(Series::new("All"))
        .filter_days("created_at", 7);

    ChartBuilder::new(&spec)
        .today(date(2024, 4, 12))
        .build(&source)
        .unwrap();

    let queries = source.queries.borrow();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].conditions, vec!["region = 'eu'".to_string()]);
    assert!(queries[1].conditions.is_empty());
    assert!(queries.iter().all(|q| q.window.is_some()));
}

#[test]
fn test_unparseable_condition_fails_build() {
    let spec = day_chart().with_series(Series::new("broken").with_condition("d ~~ 3"));
    let err = build(&visits(), &spec).unwrap_err();
    assert!(matches!(err.cause(), ChartError::ConfigError(_)));
}

#[test]
fn test_mixed_value_types_group_without_panicking() {
    let spec = ChartSpec::new("Mixed", ReportType::GroupByString, ChartType::Bar, "v");
    let source: MemorySource = (0..400u32)
        .map(|i| match i % 3 {
            0 => json!({"v": format!("{}", i % 17)}),
            1 => json!({"v": f64::from(i % 13) + 0.5}),
            _ => json!({"v": format!("{}", i % 7)}),
        })
        .collect();

    let datasets = build(&source, &spec).unwrap();
    let data = &datasets[0].data;
    assert_eq!(data.values().sum::<f64>(), 400.0);
    assert!(data.contains_key("9.5"));
    assert!(data.contains_key("10"));
}

#[test]
fn test_distinct_uses_sorted_order() {
    let spec = ChartSpec::new("Revenue per customer", ReportType::GroupByDate, ChartType::Bar, "created_at")
        .with_period(Period::Month)
        .with_aggregate(AggregateFunction::Sum, "amount")
        .with_distinct("customer_id");
    // Input order is the reverse of date order for customer 7.
    let source = MemorySource::new(vec![
        json!({"created_at": "2024-03-20 09:00:00", "customer_id": 7, "amount": 50}),
        json!({"created_at": "2024-03-10 09:00:00", "customer_id": 8, "amount": 1}),
        json!({"created_at": "2024-03-05 09:00:00", "customer_id": "7", "amount": 5}),
    ]);

    let datasets = build(&source, &spec).unwrap();
    assert_eq!(datasets[0].get("2024-03"), Some(6.0));
}

#[test]
fn test_window_with_custom_date_format() {
    let spec = ChartSpec::new("Recent visits", ReportType::GroupByDate, ChartType::Line, "day")
        .with_period(Period::Month)
        .with_date_format("%d/%m/%Y")
        .filter_days("day", 30);
    let source = MemorySource::new(vec![
        json!({"day": "10/03/2024"}),
        json!({"day": "12/03/2024"}),
        json!({"day": "01/01/2024"}),
    ]);

    let datasets = ChartBuilder::new(&spec)
        .today(date(2024, 3, 15))
        .build(&source)
        .unwrap();
    let data: Vec<(&str, f64)> = datasets[0].data.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(data, vec![("2024-03", 2.0)]);
}

fn week_visits() -> MemorySource {
    MemorySource::new(vec![
        json!({"d": "2024-03-10"}),
        json!({"d": "2024-03-11"}),
        json!({"d": "2024-03-17"}),
        json!({"d": "2024-03-18"}),
    ])
}

#[test]
fn test_week_window_starts_on_monday() {
    let spec = day_chart().filter_period("d", FilterPeriod::Week);

    // Monday: the week starts today.
    let datasets = ChartBuilder::new(&spec)
        .today(date(2024, 3, 11))
        .build(&week_visits())
        .unwrap();
    let keys: Vec<&str> = datasets[0].keys().collect();
    assert_eq!(keys, vec!["2024-03-11", "2024-03-17", "2024-03-18"]);

    // Sunday: still the week that started on Monday the 11th.
    let datasets = ChartBuilder::new(&spec)
        .today(date(2024, 3, 17))
        .build(&week_visits())
        .unwrap();
    let keys: Vec<&str> = datasets[0].keys().collect();
    assert_eq!(keys, vec!["2024-03-11", "2024-03-17", "2024-03-18"]);

    // The Sunday before belongs to the previous week.
    let datasets = ChartBuilder::new(&spec)
        .today(date(2024, 3, 10))
        .build(&week_visits())
        .unwrap();
    assert_eq!(datasets[0].data.len(), 4);
}

#[test]
fn test_year_window_starts_on_january_first() {
    let spec = ChartSpec::new("This year", ReportType::GroupByDate, ChartType::Bar, "d")
        .with_period(Period::Year)
        .filter_period("d", FilterPeriod::Year);
    let source = MemorySource::new(vec![
        json!({"d": "2023-12-31 23:59:59"}),
        json!({"d": "2024-01-01 00:00:00"}),
        json!({"d": "2024-06-30 12:00:00"}),
    ]);

    let datasets = ChartBuilder::new(&spec)
        .today(date(2024, 6, 1))
        .build(&source)
        .unwrap();
    let data: Vec<(&str, f64)> = datasets[0].data.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(data, vec![("2024", 2.0)]);
}
