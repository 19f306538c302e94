//! CSV writers for placement logs and sweep summaries.

use std::io::Write;

use chrono::{SecondsFormat, TimeZone, Utc};
use csv::Writer;

use crate::core::log_entry::LogEntry;
use crate::experiment::SweepSummary;

/// Renders an instant in seconds since the epoch as RFC3339 with nanosecond
/// precision.
pub fn format_rfc3339_nanos(time: f64) -> String {
    let nanos = (time * 1e9).round() as i64;
    Utc.timestamp_nanos(nanos)
        .to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Writes the placement log with the header
/// `job_id,node,submit,start,end,wait_ms,ci_cost`; instants as RFC3339 with
/// nanosecond precision, emissions in grams with three decimals.
pub fn write_placement_log<W: Write>(out: W, entries: &[LogEntry]) -> csv::Result<()> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(["job_id", "node", "submit", "start", "end", "wait_ms", "ci_cost"])?;
    for entry in entries {
        writer.write_record([
            entry.job_id.clone(),
            entry.node.clone(),
            format_rfc3339_nanos(entry.submit),
            format_rfc3339_nanos(entry.start),
            format_rfc3339_nanos(entry.end),
            entry.wait_ms.to_string(),
            format!("{:.3}", entry.ci_cost),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes sweep summary rows with the header
/// `ci_weight,batch_size,scheduler,avg_wait_s,avg_runtime_s,total_ci_cost,avg_solve_ms`.
pub fn write_sweep_summary<W: Write>(out: W, rows: &[SweepSummary]) -> csv::Result<()> {
    let mut writer = Writer::from_writer(out);
    writer.write_record([
        "ci_weight",
        "batch_size",
        "scheduler",
        "avg_wait_s",
        "avg_runtime_s",
        "total_ci_cost",
        "avg_solve_ms",
    ])?;
    for row in rows {
        writer.write_record([
            row.ci_weight.to_string(),
            row.batch_size.to_string(),
            row.scheduler.clone(),
            format!("{:.3}", row.avg_wait_s),
            format!("{:.3}", row.avg_runtime_s),
            format!("{:.3}", row.total_ci_cost),
            format!("{:.3}", row.avg_solve_ms),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_epoch_instants() {
        assert_eq!(format_rfc3339_nanos(0.), "1970-01-01T00:00:00.000000000Z");
        assert_eq!(format_rfc3339_nanos(90.5), "1970-01-01T00:01:30.500000000Z");
    }

    #[test]
    fn placement_log_header_and_formats() {
        let entries = vec![LogEntry {
            job_id: "j1".to_string(),
            node: "n1".to_string(),
            submit: 0.,
            start: 30.,
            end: 90.,
            wait_ms: 30000,
            ci_cost: 46.,
        }];
        let mut buffer = Vec::new();
        write_placement_log(&mut buffer, &entries).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "job_id,node,submit,start,end,wait_ms,ci_cost"
        );
        assert_eq!(
            lines.next().unwrap(),
            "j1,n1,1970-01-01T00:00:00.000000000Z,1970-01-01T00:00:30.000000000Z,\
             1970-01-01T00:01:30.000000000Z,30000,46.000"
        );
    }
}
