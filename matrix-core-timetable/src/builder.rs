use crate::contract::{canonical_streams, Timetable, TimetableStreamEntry};
use crate::error::TimetableError;
use chrono::{NaiveDate, Utc};
use chrono_tz::America::Chicago;
use matrix_core_domain::ChosenRow;
use smol_str::SmolStr;
use std::fs;
use std::path::{Path, PathBuf};

/// Timetable Builder (C12): derives `timetable_current.json` from the
/// latest Master Matrix slice, triggered by the file manager (C13) after
/// every successful matrix save.
///
/// Atomic write + directory sweep only — this struct never reads the
/// matrix itself, since the caller already has the rows in hand.
#[derive(Debug, Clone)]
pub struct TimetableBuilder {
    dir: PathBuf,
}

impl TimetableBuilder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Build and atomically write the authoritative, matrix-driven
    /// timetable for `trade_date` (defaults to the matrix's max `trade_date`
    /// when `None`), per §4.12.
    pub fn write_from_master_matrix(&self, rows: &[ChosenRow], trade_date: Option<NaiveDate>) -> Result<Timetable, TimetableError> {
        let target_date = trade_date.or_else(|| rows.iter().map(|r| r.trade_date).max());

        let streams = canonical_streams();
        let entries = streams
            .into_iter()
            .map(|stream| {
                let row = target_date.and_then(|date| rows.iter().find(|r| r.stream == stream && r.trade_date == date));
                entry_for_stream(stream, row)
            })
            .collect();

        let timetable = Timetable {
            as_of: Utc::now().with_timezone(&Chicago).to_rfc3339(),
            trading_date: target_date.map(|d| d.to_string()).unwrap_or_default(),
            timezone: SmolStr::new("America/Chicago"),
            source: SmolStr::new("master_matrix"),
            streams: entries,
        };

        self.write(&timetable)?;
        Ok(timetable)
    }

    fn write(&self, timetable: &Timetable) -> Result<(), TimetableError> {
        fs::create_dir_all(&self.dir).map_err(|source| TimetableError::Write {
            path: self.dir.clone(),
            source,
        })?;

        let dest = self.dir.join("timetable_current.json");
        let tmp = self.dir.join("timetable_current.json.tmp");

        let body = serde_json::to_string_pretty(timetable).map_err(TimetableError::Serialize)?;
        fs::write(&tmp, body).map_err(|source| TimetableError::Write { path: tmp.clone(), source })?;
        fs::rename(&tmp, &dest).map_err(|source| TimetableError::Write { path: dest.clone(), source })?;

        self.sweep(&dest)?;
        Ok(())
    }

    /// Remove every sibling file in the timetable directory except the
    /// current file just written (§4.12: "sweep all sibling files...keep
    /// only `timetable_current.json`").
    fn sweep(&self, keep: &Path) -> Result<(), TimetableError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path == keep {
                continue;
            }
            if path.is_file() {
                if let Err(source) = fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), %source, "failed to sweep stale timetable file");
                }
            }
        }
        Ok(())
    }
}

fn entry_for_stream(stream: matrix_core_domain::Stream, row: Option<&ChosenRow>) -> TimetableStreamEntry {
    let instrument = SmolStr::new(stream.instrument_root());
    let session = stream.session();

    let Some(row) = row else {
        return TimetableStreamEntry {
            stream,
            instrument,
            session,
            slot_time: SmolStr::new(""),
            decision_time: SmolStr::new(""),
            enabled: false,
            block_reason: Some(SmolStr::new("not_in_master_matrix")),
        };
    };

    let slot_time = row
        .time_change
        .clone()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| row.time.clone());

    let enabled = row.final_allowed;
    let block_reason = if enabled {
        None
    } else if let Some(reason) = row.filter_reasons.first() {
        Some(SmolStr::new(format!("master_matrix_filtered_{reason}")))
    } else {
        Some(SmolStr::new(format!(
            "master_matrix_filtered_{}",
            row.dow_full.to_lowercase()
        )))
    };

    TimetableStreamEntry {
        stream,
        instrument,
        session,
        slot_time: slot_time.clone(),
        decision_time: slot_time,
        enabled,
        block_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use matrix_core_domain::{Direction, Outcome, Session, Stream};
    use rust_decimal::Decimal;

    fn sample_row(stream: &str, trade_date: NaiveDate, final_allowed: bool) -> ChosenRow {
        ChosenRow {
            trade_date,
            stream: Stream::parse(stream).unwrap(),
            instrument: SmolStr::new(&stream[..stream.len() - 1]),
            session: Session::S1,
            direction: Some(Direction::Long),
            result: Outcome::Win,
            profit: Decimal::ONE,
            profit_dollars: Decimal::ONE,
            target: Decimal::ONE,
            range: Decimal::ONE,
            peak: Decimal::ZERO,
            stop_loss: None,
            scf_s1: None,
            scf_s2: None,
            time: SmolStr::new("07:30"),
            actual_trade_time: SmolStr::new("07:30"),
            time_change: None,
            sl: Decimal::ONE,
            slot_points: IndexMap::new(),
            slot_rolling: IndexMap::new(),
            day_of_month: 5,
            dow: 0,
            dow_full: SmolStr::new("Monday"),
            month: 1,
            session_index: 1,
            is_two_stream: false,
            dom_blocked: false,
            filter_reasons: if final_allowed { Vec::new() } else { vec![SmolStr::new("excluded_time")] },
            final_allowed,
            global_trade_id: Some(1),
            entry_time: SmolStr::new("07:30"),
            exit_time: SmolStr::new("07:30"),
            entry_price: None,
            exit_price: None,
            r: None,
            pnl: Decimal::ONE,
            rs_value: None,
            selected_time: SmolStr::new("07:30"),
            time_bucket: SmolStr::new("S1"),
        }
    }

    #[test]
    fn emits_all_twelve_streams_even_when_absent() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let rows = vec![sample_row("ES1", date, true)];

        let dir = std::env::temp_dir().join(format!("matrix-core-timetable-test-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let builder = TimetableBuilder::new(&dir);

        let timetable = builder.write_from_master_matrix(&rows, Some(date)).unwrap();
        assert_eq!(timetable.streams.len(), 12);

        let es1 = timetable.streams.iter().find(|s| s.stream.as_str() == "ES1").unwrap();
        assert!(es1.enabled);
        assert_eq!(es1.block_reason, None);

        let gc1 = timetable.streams.iter().find(|s| s.stream.as_str() == "GC1").unwrap();
        assert!(!gc1.enabled);
        assert_eq!(gc1.block_reason.as_deref(), Some("not_in_master_matrix"));

        assert!(dir.join("timetable_current.json").exists());
    }

    #[test]
    fn blocked_row_carries_filter_reason() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let rows = vec![sample_row("CL1", date, false)];

        let dir = std::env::temp_dir().join(format!("matrix-core-timetable-test-blocked-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let builder = TimetableBuilder::new(&dir);

        let timetable = builder.write_from_master_matrix(&rows, Some(date)).unwrap();
        let cl1 = timetable.streams.iter().find(|s| s.stream.as_str() == "CL1").unwrap();
        assert!(!cl1.enabled);
        assert_eq!(cl1.block_reason.as_deref(), Some("master_matrix_filtered_excluded_time"));
    }
}
