//! Job Orchestrator: the per-job pipeline between the Connection
//! Multiplexer and the Template Interpreter.
//!
//! Grounded on `convert_label()`: load the job document, apply the two
//! nested-`data` overrides, query the scale for a weight override when the
//! job is WEIGH, load the template blob and (if a selector was given) the
//! barcode template, reset the printer, and run the interpreter.

use crate::core::job::dp;
use crate::core::UomType;
use crate::core::JobState;
use crate::encoder::Encoder;
use crate::errors::{DriverError, Result};
use crate::interpreter;
use crate::jobdoc;
use crate::storage::Storage;
use crate::transport::Port;

const RD_WEIGHT_WAIT_MS: u64 = 200;

/// Run one print job end to end. `scale` is `None` when the scale device
/// failed to open at startup — the weight override is then skipped rather
/// than failing the job, matching §5's "failure of the scale FD at startup
/// is non-fatal".
pub async fn run_job(
    storage: &Storage,
    printer: &dyn Port,
    scale: Option<&dyn Port>,
    dots_per_mm: u32,
    lbl_wtgrams: bool,
    job_document: serde_json::Value,
    slot: i64,
    barcode_selector_id: i64,
) -> Result<()> {
    let mut job = jobdoc::load(job_document.clone(), lbl_wtgrams)?;
    apply_nested_overrides(&mut job, &job_document);

    if job.uom_type == UomType::Weigh {
        if let Some(scale) = scale {
            let kg = query_scale_weight(scale).await;
            job.set_float(dp::CURRENT_GROSS_WEIGHT, kg);
            job.set_float(dp::WEIGHT_OR_QUANTITY, kg);
        }
    }

    let template = storage.load_template(slot).await?;

    let barcode_template = if (1..=99).contains(&barcode_selector_id) {
        match storage.load_barcode_template(barcode_selector_id).await {
            Ok(tmpl) => Some(tmpl),
            Err(e) => {
                tracing::warn!("barcode template {} unavailable: {}", barcode_selector_id, e);
                None
            }
        }
    } else {
        None
    };

    let mut reset = Encoder::new();
    reset.reset();
    printer.write_all(&reset.into_bytes()).await?;

    interpreter::interpret(&template, &job, barcode_template.as_ref(), dots_per_mm, printer).await
}

/// The nested `data.actual_unit_price` / `data.spl_up` overrides `convert_label`
/// applies before anything else runs. `jobdoc::load` already folds `spl_up`
/// into datapoint 5 as part of populating the catalog; `actual_unit_price`
/// is folded in here since it targets datapoint 73 directly and carries no
/// fallback semantics of its own.
fn apply_nested_overrides(job: &mut JobState, raw: &serde_json::Value) {
    if let Some(v) = raw
        .get("data")
        .and_then(|d| d.get("actual_unit_price"))
        .and_then(|v| v.as_f64())
    {
        job.set_float(dp::ACTUAL_UNIT_PRICE, v);
    }
}

async fn query_scale_weight(scale: &dyn Port) -> f64 {
    if scale.write_all(&[0x05]).await.is_err() {
        return 0.0;
    }
    tokio::time::sleep(std::time::Duration::from_millis(RD_WEIGHT_WAIT_MS)).await;
    match scale.read_line(300).await {
        Ok(Some(line)) => line.trim().parse().unwrap_or(0.0),
        _ => {
            tracing::warn!("scale RD_WEIGHT returned no data");
            0.0
        }
    }
}

/// Run one print job and translate its outcome into the client-facing reply
/// token (`OK\n` / `Error printing\n`), per §4.7 and §7.
pub async fn run_job_for_reply(
    storage: &Storage,
    printer: &dyn Port,
    scale: Option<&dyn Port>,
    dots_per_mm: u32,
    lbl_wtgrams: bool,
    job_document: serde_json::Value,
    slot: i64,
    barcode_selector_id: i64,
) -> &'static str {
    match run_job(
        storage,
        printer,
        scale,
        dots_per_mm,
        lbl_wtgrams,
        job_document,
        slot,
        barcode_selector_id,
    )
    .await
    {
        Ok(()) => "OK\n",
        Err(e) => {
            tracing::error!("print job failed: {}", e);
            "Error printing\n"
        }
    }
}

/// Parse a job document from disk. Out of scope per §1 is the JSON
/// collaborator itself; this is the thin file-read + parse step the
/// Orchestrator performs before handing the value to [`run_job`].
pub async fn load_job_document(path: &str) -> Result<serde_json::Value> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DriverError::JobDocumentInvalid(format!("{path}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(DriverError::from)
}
