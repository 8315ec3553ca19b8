use crate::compliance::ComplianceSnapshot;
use crate::error::CoreResult;
use crate::validator::result::Severity;

/// One row per violation of every failing artifact, in snapshot order.
pub fn render_failures_csv(snapshot: &ComplianceSnapshot) -> CoreResult<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(["artifact", "zone", "kind", "severity", "field", "message"])?;
    for f in &snapshot.failures {
        for v in &f.violations {
            let severity = match v.severity {
                Severity::BLOCKER => "BLOCKER",
                Severity::ADVISORY => "ADVISORY",
            };
            wtr.write_record([
                f.artifact.as_str(),
                f.zone.as_str(),
                v.kind.as_str(),
                severity,
                v.field.as_deref().unwrap_or(""),
                v.message.as_str(),
            ])?;
        }
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}
