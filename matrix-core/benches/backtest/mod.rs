use chrono::NaiveDate;
use criterion::{Criterion, Throughput};
use matrix_core_domain::{AnalyzerRow, Direction, Outcome, Session, Stream, StreamConfig};
use matrix_core_sequencer::{canonical_sort, process_stream_daily};
use rust_decimal::Decimal;
use smol_str::SmolStr;

criterion::criterion_main!(benchmark_sequencer, benchmark_canonical_sort);

/// `n` days of `ES1` analyzer output, one row per canonical S1 slot per day,
/// every fifth day a loss — enough slot-switch churn to exercise the
/// comparison branch of the daily loop (§4.7.2 step 6) rather than the
/// degenerate all-win path.
fn synthetic_rows(stream: &Stream, n: i64) -> Vec<AnalyzerRow> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let slots = ["07:30", "08:00", "09:00"];

    (0..n)
        .map(|i| {
            let trade_date = start + chrono::Duration::days(i);
            let slot = slots[(i as usize) % slots.len()];
            let result = if i % 5 == 0 { Outcome::Loss } else { Outcome::Win };
            AnalyzerRow {
                trade_date,
                time: SmolStr::new(slot),
                stream: stream.clone(),
                instrument: SmolStr::new("ES"),
                session: Session::S1,
                direction: Some(Direction::Long),
                result,
                profit: Decimal::ONE,
                target: Decimal::ONE,
                range: Decimal::from(2),
                peak: Decimal::ZERO,
                stop_loss: None,
                scf_s1: None,
                scf_s2: None,
                onr: None,
                onr_high: None,
                onr_low: None,
            }
        })
        .collect()
}

fn benchmark_sequencer() {
    let mut c = Criterion::default().without_plots();
    let stream = Stream::parse("ES1").unwrap();
    let config = StreamConfig::default();

    for days in [252_i64, 252 * 10] {
        let rows = synthetic_rows(&stream, days);

        let mut group = c.benchmark_group("process_stream_daily");
        group.throughput(Throughput::Elements(days as u64));
        group.bench_function(format!("{days}-days"), |b| {
            b.iter(|| process_stream_daily(&stream, &rows, &config, None, None).unwrap())
        });
        group.finish();
    }
}

fn benchmark_canonical_sort() {
    let mut c = Criterion::default().without_plots();
    let stream = Stream::parse("ES1").unwrap();
    let config = StreamConfig::default();

    for days in [252_i64, 252 * 10] {
        let rows = synthetic_rows(&stream, days);
        let outcome = process_stream_daily(&stream, &rows, &config, None, None).unwrap();

        let mut group = c.benchmark_group("canonical_sort");
        group.throughput(Throughput::Elements(days as u64));
        group.bench_function(format!("{days}-rows"), |b| {
            b.iter_batched(
                || outcome.rows.clone(),
                |mut chosen| canonical_sort(&mut chosen),
                criterion::BatchSize::LargeInput,
            )
        });
        group.finish();
    }
}
