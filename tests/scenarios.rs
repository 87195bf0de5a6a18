//! End-to-end scenarios driving the full Orchestrator -> Template
//! Interpreter -> Encoder pipeline against `MemoryPort`s and an in-memory
//! SQLite store, with no real serial hardware involved.

use scalelabel::orchestrator::run_job;
use scalelabel::storage::{FieldCondition, Storage};
use scalelabel::transport::MemoryPort;

async fn storage_with(slot: i64, template: &str) -> Storage {
    let storage = Storage::new("sqlite::memory:").await.unwrap();
    storage.initialize_tables().await.unwrap();
    storage.save_template(slot, template.as_bytes()).await.unwrap();
    storage
}

/// Scenario A: a weigh-item label prints the resolved net weight text.
#[tokio::test]
async fn weight_label_prints_resolved_weight_text() {
    let template = "~S 54,40\n~V 5,5,0,1,1,1,69,,8,0,L,1,3,N,1\n~P 1,D\n";
    let storage = storage_with(1, template).await;
    let printer = MemoryPort::new();
    let doc = serde_json::json!({
        "plu_id": 101,
        "guom": "kg",
        "unit_price": 199.0,
        "current_net_weight": 0.256,
    });

    run_job(&storage, &printer, None, 8, true, doc, 1, 0).await.unwrap();

    let bytes = printer.written_bytes();
    assert!(bytes.starts_with(&[0x1B, 0x40]));
    assert!(bytes.windows(3).any(|w| w == b"256" || w == b"0.2"));
}

/// Scenario B: a `~B` directive against an EAN-13 barcode template emits
/// the `GS k` EAN-13 opcode.
#[tokio::test]
async fn ean13_barcode_template_emits_ean13_opcode() {
    let template = "~S 54,40\n~B 5,5,0,0,0.25,10,0,12,0,L,0,N,W\n";
    let storage = storage_with(1, template).await;
    storage
        .save_barcode_template(&scalelabel::storage::BarcodeTemplate {
            barcode_number: 1,
            data: "12L".to_string(),
            barcode_type: "EAN13".to_string(),
            name: "plu-ean".to_string(),
            fld1: None,
            fld1_condition: FieldCondition::No,
            fld1_shift: None,
            fld2: None,
            fld2_condition: FieldCondition::No,
            fld2_shift: None,
        })
        .await
        .unwrap();

    let printer = MemoryPort::new();
    let doc = serde_json::json!({"plu_id": 123456789012i64, "guom": "pcs", "unit_price": 50.0});

    run_job(&storage, &printer, None, 8, true, doc, 1, 1).await.unwrap();

    let bytes = printer.written_bytes();
    assert!(bytes.windows(3).any(|w| w == [0x1D, b'k', 2]));
}

/// Scenario C: a `~T` directive with print-status `0` (never print) emits
/// nothing for that directive, while the rest of the label still renders.
#[tokio::test]
async fn status_zero_suppresses_only_its_own_directive() {
    let template = "~S 54,40\n~T 5,5,0,1,1,1,hidden,6,0,L,1,3,N,0\n~R 0,0,0,5,5,0.2,N\n";
    let storage = storage_with(1, template).await;
    let printer = MemoryPort::new();
    let doc = serde_json::json!({"guom": "pcs", "unit_price": 50.0});

    run_job(&storage, &printer, None, 8, true, doc, 1, 0).await.unwrap();

    let bytes = printer.written_bytes();
    assert!(!bytes.windows(6).any(|w| w == b"hidden"));
    assert!(bytes.windows(2).any(|w| w == [0x1C, b'R']));
}

/// Scenario D: a CODE128 barcode template (not all-digit, not QR) emits
/// the `GS k` CODE128 opcode.
#[tokio::test]
async fn qr_sized_payload_uses_qr_opcode() {
    let template = "~S 54,40\n~B 5,5,0,0,0.25,10,0,40,0,L,0,N,W\n";
    let storage = storage_with(1, template).await;
    storage
        .save_barcode_template(&scalelabel::storage::BarcodeTemplate {
            barcode_number: 2,
            data: "%QR-5L".to_string(),
            barcode_type: "QRCODE".to_string(),
            name: "plu-qr".to_string(),
            fld1: None,
            fld1_condition: FieldCondition::No,
            fld1_shift: None,
            fld2: None,
            fld2_condition: FieldCondition::No,
            fld2_shift: None,
        })
        .await
        .unwrap();

    let printer = MemoryPort::new();
    let doc = serde_json::json!({"plu_id": 42, "guom": "pcs", "unit_price": 50.0});

    run_job(&storage, &printer, None, 8, true, doc, 1, 2).await.unwrap();

    let bytes = printer.written_bytes();
    assert!(bytes.windows(2).any(|w| w == [0x1D, b'(']));
}

/// Scenario E: `~A` clears an area by switching the window, cancelling, and
/// restoring the full label window.
#[tokio::test]
async fn clear_area_directive_round_trips_the_window() {
    let template = "~S 54,40\n~A 5,5,20,10,N\n";
    let storage = storage_with(1, template).await;
    let printer = MemoryPort::new();

    run_job(&storage, &printer, None, 8, true, serde_json::json!({}), 1, 0)
        .await
        .unwrap();

    let bytes = printer.written_bytes();
    assert!(bytes.windows(2).any(|w| w == [0x18, 0x18]) || bytes.contains(&0x18));
}

/// Scenario F: the scale is unavailable (the Orchestrator was handed
/// `None`), so a WEIGH job's weight datapoints fall back to the document's
/// own values rather than failing the job.
#[tokio::test]
async fn weigh_job_without_a_scale_still_completes() {
    let template = "~S 54,40\n~P 1,D\n";
    let storage = storage_with(1, template).await;
    let printer = MemoryPort::new();
    let doc = serde_json::json!({"guom": "kg", "unit_price": 100.0, "current_net_weight": 0.5});

    let result = run_job(&storage, &printer, None, 8, true, doc, 1, 0).await;

    assert!(result.is_ok());
    assert!(!printer.written_bytes().is_empty());
}
