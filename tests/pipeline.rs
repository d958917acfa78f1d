use std::fs;

use chrono::{Days, NaiveDate};
use rstest::rstest;
use tempfile::TempDir;

use influence_dash::analysis::aggregate::{self, Aggregation, DerivedRatio, GroupSpec};
use influence_dash::analysis::decompose;
use influence_dash::config::AnalysisConfig;
use influence_dash::data::cache::LoadCache;
use influence_dash::data::export;
use influence_dash::data::filter::{self, DateRange, FilterSelection};
use influence_dash::data::loader::{self, load_csv};
use influence_dash::data::model::Value;
use influence_dash::data::schema::DatasetSchema;
use influence_dash::{pipeline, report, Error};

const CAMPAIGN: &str = "\
Influencer ID,Platform,Product ID,Revenue ($),Cost ($),ROI (%),Engagement Rate (%),Sales Spike,Date
A,TikTok,P1,100,0,0,3.5,No,2024-01-01
B,Instagram,P1,200,100,200,4.0,Yes,2024-01-02
C,TikTok,P2,0,50,0,1.5,No,2024-01-03
";

fn roi_spec() -> GroupSpec {
    GroupSpec {
        key: "Influencer ID".to_string(),
        aggregations: vec![Aggregation::sum("Revenue ($)"), Aggregation::sum("Cost ($)")],
        ratio: Some(DerivedRatio {
            name: "ROI (%)".to_string(),
            numerator: 0,
            denominator: 1,
            scale: 100.0,
        }),
    }
}

/// Daily revenue rows with a weekly multiplier, one row per day.
fn seasonal_csv(days: u64) -> String {
    let pattern = [0.8, 0.9, 1.0, 1.0, 1.1, 1.3, 0.9];
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut csv = String::from("Influencer ID,Platform,Product ID,Revenue ($),Cost ($),Date\n");
    for d in 0..days {
        let date = start.checked_add_days(Days::new(d)).unwrap();
        let revenue = 1000.0 * pattern[d as usize % 7];
        csv.push_str(&format!("INF1,TikTok,P1,{revenue},100,{date}\n"));
    }
    csv
}

#[test]
fn roi_ranking_puts_zero_cost_group_after_profitable_one() {
    let schema = DatasetSchema::influencer();
    let table = load_csv(CAMPAIGN.as_bytes(), &schema).unwrap();
    let groups = aggregate::aggregate(&table, &roi_spec()).unwrap();

    let ranked: Vec<(String, f64)> = groups
        .iter()
        .map(|g| (g.key.to_string(), g.ratio.unwrap()))
        .collect();
    assert_eq!(
        ranked,
        vec![
            ("B".to_string(), 200.0),
            ("A".to_string(), 0.0),
            ("C".to_string(), 0.0)
        ]
    );
}

#[rstest]
#[case::all(vec!["TikTok", "Instagram"], 3)]
#[case::one_platform(vec!["TikTok"], 2)]
#[case::unseen_value(vec!["YouTube"], 0)]
#[case::nothing(vec![], 0)]
fn platform_filter_row_counts(#[case] platforms: Vec<&str>, #[case] expected: usize) {
    let schema = DatasetSchema::influencer();
    let table = load_csv(CAMPAIGN.as_bytes(), &schema).unwrap();
    let selection = FilterSelection::all_observed(&table, &schema.roles.filters)
        .with("Platform", platforms.into_iter().map(Value::from));

    let view = pipeline::compute(&table, &schema, &selection, &AnalysisConfig::default());
    assert_eq!(view.filtered.len(), expected);
    assert_eq!(view.metrics.as_ref().unwrap().rows, expected);
}

#[test]
fn empty_selection_gives_empty_views_without_errors() {
    let schema = DatasetSchema::influencer();
    let table = load_csv(CAMPAIGN.as_bytes(), &schema).unwrap();
    let selection = FilterSelection::default().with("Influencer ID", Vec::<Value>::new());
    let view = pipeline::compute(&table, &schema, &selection, &AnalysisConfig::default());

    assert!(view.filtered.is_empty());
    assert!(view.summary.as_ref().unwrap().is_empty());
    assert!(view.ranking.as_ref().unwrap().is_empty());

    let metrics = view.metrics.as_ref().unwrap();
    assert_eq!(metrics.total_measure, 0.0);
    assert_eq!(metrics.blended_roi, Some(0.0));
    assert_eq!(metrics.top_performer, None);
}

#[rstest]
#[case::missing_cost("Influencer ID,Platform,Product ID,Revenue ($)\nA,TikTok,P1,10\n", "Cost ($)")]
#[case::missing_platform("Influencer ID,Product ID,Revenue ($),Cost ($)\nA,P1,10,1\n", "Platform")]
fn missing_required_columns_are_blocking(#[case] csv: &str, #[case] missing: &str) {
    let err = load_csv(csv.as_bytes(), &DatasetSchema::influencer()).unwrap_err();
    assert!(err.is_blocking());
    match err {
        Error::MissingColumns(cols) => assert!(cols.iter().any(|c| c == missing)),
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

#[test]
fn file_round_trip_through_export() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("campaign.csv");
    fs::write(&source, CAMPAIGN).unwrap();

    let schema = DatasetSchema::influencer();
    let table = loader::load_file(&source, &schema).unwrap();
    let selection = FilterSelection::default().with("Platform", [Value::from("TikTok")]);
    let filtered = filter::apply(&table, &selection);

    let out = dir.path().join("filtered.csv");
    export::write_csv_file(&filtered, &out).unwrap();
    let reloaded = loader::load_file(&out, &schema).unwrap();

    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.column_names().collect::<Vec<_>>(), table.column_names().collect::<Vec<_>>());
    assert_eq!(reloaded.rows, filtered.rows);
}

#[test]
fn cache_returns_shared_table_for_identical_content() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.csv");
    let second = dir.path().join("b.csv");
    fs::write(&first, CAMPAIGN).unwrap();
    fs::write(&second, CAMPAIGN).unwrap();

    let schema = DatasetSchema::influencer();
    let mut cache = LoadCache::new();
    let a = cache.load_file(&first, &schema).unwrap();
    let b = cache.load_file(&second, &schema).unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
}

#[test]
fn weekly_pattern_is_recovered_from_daily_rows() {
    let schema = DatasetSchema::influencer();
    let table = load_csv(seasonal_csv(28).as_bytes(), &schema).unwrap();
    let series = decompose::daily_totals(&table, "Date", "Revenue ($)").unwrap();
    let d = decompose::decompose(&series, 7).unwrap();

    // 2024-01-01 is a Monday, the first phase of the pattern.
    let factors = d.seasonal_factors();
    let mean: f64 = factors.iter().sum::<f64>() / 7.0;
    assert!((mean - 1.0).abs() < 1e-9);
    assert!((factors[5] - 1.3).abs() < 1e-9);
    assert!((factors[0] - 0.8).abs() < 1e-9);
}

#[test]
fn short_series_only_skips_the_decomposition() {
    let schema = DatasetSchema::influencer();
    let table = load_csv(seasonal_csv(10).as_bytes(), &schema).unwrap();
    let selection = FilterSelection::all_observed(&table, &schema.roles.filters);
    let view = pipeline::compute(&table, &schema, &selection, &AnalysisConfig::default());

    assert!(view.summary.is_ok());
    assert!(view.metrics.is_ok());
    let err = view.decomposition.unwrap().unwrap_err();
    assert!(matches!(err, Error::InsufficientData { needed: 14, available: 10 }));
    assert!(!err.is_blocking());
}

#[test]
fn date_range_narrows_every_view() {
    let schema = DatasetSchema::influencer();
    let table = load_csv(seasonal_csv(28).as_bytes(), &schema).unwrap();
    let start = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
    let selection = FilterSelection::all_observed(&table, &schema.roles.filters).with_date_range(DateRange {
        column: "Date".to_string(),
        start,
        end: NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
    });
    let view = pipeline::compute(&table, &schema, &selection, &AnalysisConfig::default());

    assert_eq!(view.filtered.len(), 7);
    assert!(matches!(
        view.decomposition,
        Some(Err(Error::InsufficientData { available: 7, .. }))
    ));
}

#[test]
fn report_mentions_top_group_and_marks_skipped_sections() {
    let schema = DatasetSchema::influencer();
    let table = load_csv(CAMPAIGN.as_bytes(), &schema).unwrap();
    let selection = FilterSelection::all_observed(&table, &schema.roles.filters);
    let view = pipeline::compute(&table, &schema, &selection, &AnalysisConfig::default());

    let text = report::render_text(&view, &schema);
    assert!(text.contains("Influencer Impact on Brand Sales"));
    assert!(text.contains("B"));

    let doc = report::to_json(&view, &schema);
    assert_eq!(doc["rows"], 3);
    assert!(doc["decomposition"]["error"].is_string());
}

#[test]
fn penguins_variant_groups_by_species() {
    let csv = "\
species,island,bill_length_mm,body_mass_g,sex,year
Adelie,Torgersen,39.1,3750,male,2007
Adelie,Torgersen,NA,NA,NA,2007
Gentoo,Biscoe,46.1,5000,female,2008
";
    let schema = DatasetSchema::penguins();
    let table = load_csv(csv.as_bytes(), &schema).unwrap();
    let selection = FilterSelection::all_observed(&table, &schema.roles.filters);
    let view = pipeline::compute(&table, &schema, &selection, &AnalysisConfig::default());

    let ranking = view.ranking.unwrap();
    assert_eq!(ranking, vec![(Value::from("Adelie"), 3750.0), (Value::from("Gentoo"), 5000.0)]);
    assert!(view.decomposition.is_none());
    assert_eq!(view.metrics.unwrap().total_cost, None);
}
