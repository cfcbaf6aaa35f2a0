mod support;

use std::sync::Arc;

use chrono::NaiveDate;

use neptun_engine::config::{EngineConfig, TimeoutTiers};
use neptun_engine::crawler::{AvailabilityCrawler, CrawlError};
use neptun_engine::sink::{CollectingSink, EventSink};

use support::{FakeDriver, FakeElement};

const INPUT: &str = "form div input[type='text']";
const SEARCH: &str = "form div div button";
const BANNER: &str = ".alert-danger";
const RESOURCE: &str = "form > button";
const COUNTER: &str = "form > button span:nth-of-type(2)";
const TABLE: &str = ".datepicker-days table tbody";
const HEADER: &str = "th.datepicker-switch";
const CELL: &str = ".datepicker-days table tbody td";
const ARROW: &str = "th.next";
const SLOT: &str = ".alert-outline-primary";

fn test_config() -> EngineConfig {
    EngineConfig {
        portal_url: "http://portal.test/step1".into(),
        max_retry_attempts: 2,
        base_retry_delay_ms: 1,
        poll_interval_ms: 5,
        click_wait_ms: 20,
        timeouts: TimeoutTiers {
            short_ms: 40,
            medium_ms: 80,
            long_ms: 120,
        },
        max_months: 2,
        minimum_available_days: 1,
    }
}

fn entry_pages(driver: FakeDriver) -> FakeDriver {
    driver
        .page(
            "entry",
            vec![
                FakeElement::css(INPUT),
                FakeElement::css(SEARCH).text("Cauta").goes_to("validated"),
            ],
        )
        .page(
            "validated",
            vec![
                FakeElement::css(RESOURCE)
                    .text("Sauna Paradis\nRezervari ramase: 8")
                    .goes_to("calendar-1"),
                FakeElement::css(COUNTER).text("Rezervari ramase: 8"),
            ],
        )
}

/// September view whose trailing cells already belong to October: the
/// crawler must roll the working month over exactly once, at 30 -> 1.
fn september_view() -> Vec<FakeElement> {
    vec![
        FakeElement::css(HEADER).text("Septembrie 2026"),
        FakeElement::css(TABLE),
        FakeElement::css(CELL).text("28").class("day old disabled"),
        FakeElement::css(CELL).text("29").class("day old disabled"),
        FakeElement::css(CELL).text("30").class("day").goes_to("slots-30"),
        FakeElement::css(CELL).text("1").class("day new").goes_to("slots-1"),
        FakeElement::css(CELL).text("2").class("day new").goes_to("slots-2"),
        FakeElement::css(ARROW).text("»").class("next").goes_to("calendar-2"),
    ]
}

fn october_view() -> Vec<FakeElement> {
    vec![
        FakeElement::css(HEADER).text("Octombrie 2026"),
        FakeElement::css(TABLE),
        FakeElement::css(CELL).text("1").class("day").goes_to("slots-1"),
        FakeElement::css(CELL).text("2").class("day").goes_to("slots-2"),
        FakeElement::css(CELL).text("5").class("day").goes_to("slots-5"),
    ]
}

fn full_portal() -> FakeDriver {
    entry_pages(FakeDriver::new("entry"))
        .page("calendar-1", september_view())
        .page("calendar-2", october_view())
        .page(
            "slots-30",
            vec![
                FakeElement::css(SLOT).text("10:30 - 14:00\nLocuri disponibile: 3"),
                FakeElement::css(SLOT).text("Nu sunt locuri disponibile"),
            ],
        )
        .page(
            "slots-1",
            vec![FakeElement::css(SLOT).text("Grupa A 08:00-10:00\nLocuri disponibile: 5")],
        )
        .page("slots-2", vec![])
        .page(
            "slots-5",
            vec![FakeElement::css(SLOT).text("12:00 - 14:00\nLocuri disponibile: 1")],
        )
}

#[tokio::test]
async fn full_crawl_walks_two_months_and_dedups_dates() {
    let sink = Arc::new(CollectingSink::new());
    let crawler = AvailabilityCrawler::with_session(
        test_config(),
        Arc::clone(&sink) as Arc<dyn EventSink>,
        "t1",
    );
    let mut driver = full_portal();

    let summary = crawler.run(&mut driver, "5642ece785", None).await.unwrap();

    assert_eq!(summary.months_visited, 2);
    assert_eq!(summary.dates_failed, 0);
    assert_eq!(summary.remaining_reservations, Some(8));
    assert_eq!(summary.records_collected, 3);

    let records = sink.records();
    assert_eq!(records.len(), 3);

    // Rollover applied once: 30 stays September, 1 and 2 become October.
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()));
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()));
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2026, 10, 5).unwrap()));

    // The October view repeats days 1 and 2; seen dates are not reprocessed,
    // so no (date, slot) pair appears twice.
    let mut pairs: Vec<(NaiveDate, String)> = records
        .iter()
        .map(|r| (r.date, r.time_slot.clone()))
        .collect();
    pairs.sort();
    pairs.dedup();
    assert_eq!(pairs.len(), records.len());

    // The no-availability card yielded no record at all, not a zero-count.
    assert!(
        records
            .iter()
            .all(|r| !(r.date == NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()
                && r.spots_available == 0))
    );

    assert_eq!(records[0].subscription_code, "5642ece785");
    assert_eq!(records[0].subscription_name, "Sauna Paradis");
}

#[tokio::test]
async fn slot_fields_are_parsed_into_the_record() {
    let sink = Arc::new(CollectingSink::new());
    let crawler = AvailabilityCrawler::with_session(
        test_config(),
        Arc::clone(&sink) as Arc<dyn EventSink>,
        "t2",
    );
    let mut driver = full_portal();

    crawler
        .run(&mut driver, "5642ece785", Some("Kicky"))
        .await
        .unwrap();

    let records = sink.records();
    let first = records
        .iter()
        .find(|r| r.date == NaiveDate::from_ymd_opt(2026, 9, 30).unwrap())
        .unwrap();
    assert_eq!(first.time_slot, "10:30 - 14:00");
    assert_eq!(first.spots_available, 3);
    assert_eq!(first.subscription_name, "Kicky");
}

#[tokio::test]
async fn rejected_code_is_terminal_invalid_subscription() {
    let sink = Arc::new(CollectingSink::new());
    let crawler = AvailabilityCrawler::with_session(test_config(), sink, "t3");
    let mut driver = FakeDriver::new("entry")
        .page(
            "entry",
            vec![
                FakeElement::css(INPUT),
                FakeElement::css(SEARCH).text("Cauta").goes_to("rejected"),
            ],
        )
        .page(
            "rejected",
            vec![
                FakeElement::css(BANNER)
                    .text("Abonamentul nu a fost gasit")
                    .class("alert-danger"),
            ],
        );

    let err = crawler.run(&mut driver, "bogus", None).await.unwrap_err();
    match err {
        CrawlError::InvalidSubscription(message) => {
            assert!(message.contains("nu a fost gasit"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_calendar_is_a_booking_failure() {
    let sink = Arc::new(CollectingSink::new());
    let crawler = AvailabilityCrawler::with_session(test_config(), sink, "t4");
    // The resource button leads to a page with no calendar at all.
    let mut driver = entry_pages(FakeDriver::new("entry")).page("calendar-1", vec![]);

    let err = crawler.run(&mut driver, "5642ece785", None).await.unwrap_err();
    assert!(matches!(err, CrawlError::BookingFailed(_)));
}

#[tokio::test]
async fn absent_next_month_control_finishes_early() {
    let sink = Arc::new(CollectingSink::new());
    let crawler = AvailabilityCrawler::with_session(
        test_config(),
        Arc::clone(&sink) as Arc<dyn EventSink>,
        "t5",
    );
    let mut september = september_view();
    september.retain(|e| e.class != "next");
    let mut driver = entry_pages(FakeDriver::new("entry"))
        .page("calendar-1", september)
        .page(
            "slots-30",
            vec![FakeElement::css(SLOT).text("10:30 - 14:00\nLocuri disponibile: 3")],
        )
        .page("slots-1", vec![])
        .page("slots-2", vec![]);

    let summary = crawler.run(&mut driver, "5642ece785", None).await.unwrap();
    // max_months is 2, but only one view was reachable. Not an error.
    assert_eq!(summary.months_visited, 1);
    assert_eq!(summary.records_collected, 1);
}

#[tokio::test]
async fn one_broken_date_is_skipped_not_fatal() {
    let sink = Arc::new(CollectingSink::new());
    let crawler = AvailabilityCrawler::with_session(
        test_config(),
        Arc::clone(&sink) as Arc<dyn EventSink>,
        "t6",
    );
    let mut september = september_view();
    september.retain(|e| e.class != "next");
    let mut driver = entry_pages(FakeDriver::new("entry"))
        .page("calendar-1", september)
        .page("slots-30", vec![FakeElement::css(SLOT).text("junk without a time")])
        .page(
            "slots-1",
            vec![FakeElement::css(SLOT).text("08:00 - 10:00\nLocuri disponibile: 2")],
        )
        .page("slots-2", vec![]);

    let summary = crawler.run(&mut driver, "5642ece785", None).await.unwrap();
    // The junk card parses to nothing; the crawl continues to later dates.
    assert_eq!(summary.records_collected, 1);
    assert_eq!(summary.dates_failed, 0);
    let records = sink.records();
    assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
}

#[tokio::test]
async fn thin_first_view_advances_before_iterating() {
    let sink = Arc::new(CollectingSink::new());
    let mut config = test_config();
    config.minimum_available_days = 10;
    let crawler = AvailabilityCrawler::with_session(
        config,
        Arc::clone(&sink) as Arc<dyn EventSink>,
        "t7",
    );
    let mut driver = full_portal();

    let summary = crawler.run(&mut driver, "5642ece785", None).await.unwrap();

    // Three enabled September dates are under the threshold: one immediate
    // advance, counted against max_months, then only October is iterated.
    assert_eq!(summary.months_visited, 2);
    assert_eq!(summary.records_collected, 2);
    let dates: Vec<NaiveDate> = sink.records().iter().map(|r| r.date).collect();
    assert!(!dates.contains(&NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()));
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()));
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2026, 10, 5).unwrap()));
}

#[tokio::test]
async fn lost_history_during_restore_is_a_booking_failure() {
    let sink = Arc::new(CollectingSink::new());
    let crawler = AvailabilityCrawler::with_session(test_config(), sink, "t8");
    // The date cell replaces the document instead of pushing it, so going
    // back lands on the validation step and the calendar never reappears.
    let mut driver = entry_pages(FakeDriver::new("entry"))
        .page(
            "calendar-1",
            vec![
                FakeElement::css(HEADER).text("Septembrie 2026"),
                FakeElement::css(TABLE),
                FakeElement::css(CELL).text("15").class("day").swaps_to("slots-15"),
            ],
        )
        .page("slots-15", vec![]);

    let err = crawler.run(&mut driver, "5642ece785", None).await.unwrap_err();
    match err {
        CrawlError::BookingFailed(message) => {
            assert!(message.contains("calendar view lost"), "got: {message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
