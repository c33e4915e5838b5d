use chrono::NaiveDate;
use variation::{
    build, build_with_range, Category, DateRange, InstrumentCatalog, InstrumentId,
    RawObservation, SqliteHistoryStore, Window, WindowBoundaries,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn id(symbol: &str) -> InstrumentId {
    InstrumentId::new(symbol).unwrap()
}

#[test]
fn standard_catalog_from_sqlite_cache() {
    let catalog = InstrumentCatalog::standard().unwrap();
    let mut store = SqliteHistoryStore::new_in_memory().unwrap();

    // Real: closes over the turn of the year, with a holiday gap and a missing quote
    store
        .insert_observations(
            &id("USDBRL=X"),
            &[
                RawObservation::new(date(2024, 12, 30), 6.18),
                RawObservation::new(date(2025, 1, 2), 6.20),
                RawObservation::missing(date(2025, 1, 3)),
                RawObservation::new(date(2025, 1, 10), 6.10),
                RawObservation::new(date(2025, 1, 21), 5.89),
            ],
        )
        .unwrap();
    // Bovespa: nothing this year yet
    store
        .insert_observations(
            &id("^BVSP"),
            &[
                RawObservation::new(date(2024, 12, 27), 120_269.0),
                RawObservation::new(date(2024, 12, 30), 120_283.0),
            ],
        )
        .unwrap();
    // Gold: only a zero close
    store
        .insert_observations(&id("GC=F"), &[RawObservation::new(date(2025, 1, 2), 0.0)])
        .unwrap();

    let table = build(&catalog, &store, date(2025, 1, 21));
    assert_eq!(table.len(), catalog.len());

    let row_of = |symbol: &str| {
        table
            .rows()
            .iter()
            .find(|row| row.instrument().as_str() == symbol)
            .unwrap()
    };

    let real = row_of("USDBRL=X");
    assert_eq!(real.category(), Category::Currency);
    let ytd = real.year_to_date().unwrap();
    assert!((ytd - (5.89 - 6.20) / 6.20 * 100.0).abs() < 1e-9);
    // 7 business days before 2025-01-21 is 2025-01-10
    let seven = real.variation(Window::SevenDays).unwrap();
    assert!((seven - (5.89 - 6.10) / 6.10 * 100.0).abs() < 1e-9);
    // 45 business days back lands in November, before any cached close
    assert_eq!(real.variation(Window::FortyFiveDays), None);

    let bovespa = row_of("^BVSP");
    assert_eq!(bovespa.year_to_date(), None);
    assert_eq!(bovespa.variation(Window::SevenDays), Some(0.0));

    assert!(row_of("GC=F").is_undefined());
    assert!(row_of("CL=F").is_undefined());
}

#[test]
fn explicit_range_limits_history() {
    let catalog = InstrumentCatalog::from_json_str(
        r#"[{"id": "^GSPC", "name": "S&P 500", "category": "index"}]"#,
    )
    .unwrap();
    let mut store = SqliteHistoryStore::new_in_memory().unwrap();
    store
        .insert_observations(
            &id("^GSPC"),
            &[
                RawObservation::new(date(2024, 12, 31), 5881.63),
                RawObservation::new(date(2025, 1, 2), 5868.55),
                RawObservation::new(date(2025, 1, 21), 6049.24),
            ],
        )
        .unwrap();

    let boundaries = WindowBoundaries::for_today(date(2025, 1, 21));
    let range = DateRange::new(date(2025, 1, 1), date(2025, 1, 21));
    let table = build_with_range(&catalog, &store, &boundaries, &range);

    let row = &table.rows()[0];
    assert!((row.year_to_date().unwrap() - (6049.24 - 5868.55) / 5868.55 * 100.0).abs() < 1e-9);
    // The December close is outside the fetched range
    assert_eq!(row.variation(Window::FortyFiveDays), None);

    let groups = table.by_category();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].0, Category::Index);
}
