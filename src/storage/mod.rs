//! Storage Adapter: reads template blobs and barcode-template rows from the
//! SQLite store. How rows get populated is someone else's concern — this
//! module only ever reads what's already there, plus creates the tables on
//! a fresh database so the binary is runnable out of the box.

use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};

use crate::errors::{DriverError, Result};

/// A barcode condition gates whether a field label renders beneath the
/// bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCondition {
    No,
    Any,
    Weight,
    Quantity,
}

impl FieldCondition {
    fn parse(s: &str) -> Self {
        match s {
            "Weight" => FieldCondition::Weight,
            "Quantity" => FieldCondition::Quantity,
            "No" => FieldCondition::No,
            _ => FieldCondition::Any,
        }
    }

    /// "No" reads as "no condition" — it and "Any" both always permit the
    /// field; only "Weight"/"Quantity" actually gate on the job's values.
    pub fn permits(self, weight: f64, quantity: f64) -> bool {
        match self {
            FieldCondition::No | FieldCondition::Any => true,
            FieldCondition::Weight => weight > 0.0,
            FieldCondition::Quantity => quantity > 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BarcodeTemplate {
    pub barcode_number: i64,
    pub data: String,
    pub barcode_type: String,
    pub name: String,
    pub fld1: Option<String>,
    pub fld1_condition: FieldCondition,
    pub fld1_shift: Option<String>,
    pub fld2: Option<String>,
    pub fld2_condition: FieldCondition,
    pub fld2_shift: Option<String>,
}

pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;").execute(conn).await?;
                    Ok(())
                })
            })
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn initialize_tables(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS lft_files (
                slot INTEGER PRIMARY KEY,
                content BLOB NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS barcode_templates (
                barcode_number INTEGER PRIMARY KEY,
                barcode_data TEXT NOT NULL,
                barcode_type TEXT NOT NULL,
                barcode_name TEXT NOT NULL,
                barcode_fld1 TEXT,
                fld1_condition TEXT,
                fld1_shift TEXT,
                barcode_fld2 TEXT,
                fld2_condition TEXT,
                fld2_shift TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// `SELECT content FROM lft_files WHERE slot = ?`
    pub async fn load_template(&self, slot: i64) -> Result<Vec<u8>> {
        let row = sqlx::query("SELECT content FROM lft_files WHERE slot = ?")
            .bind(slot)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get::<Vec<u8>, _>("content")?),
            None => Err(DriverError::TemplateNotFound(slot)),
        }
    }

    pub async fn save_template(&self, slot: i64, content: &[u8]) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO lft_files (slot, content) VALUES (?, ?)")
            .bind(slot)
            .bind(content)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn load_barcode_template(&self, barcode_number: i64) -> Result<BarcodeTemplate> {
        if !(1..=99).contains(&barcode_number) {
            return Err(DriverError::BarcodeTemplateMissing(barcode_number));
        }

        let row = sqlx::query(
            "SELECT barcode_number, barcode_data, barcode_type, barcode_name,
                    barcode_fld1, fld1_condition, fld1_shift,
                    barcode_fld2, fld2_condition, fld2_shift
             FROM barcode_templates WHERE barcode_number = ?",
        )
        .bind(barcode_number)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(DriverError::BarcodeTemplateMissing(barcode_number))?;

        Ok(BarcodeTemplate {
            barcode_number: row.try_get("barcode_number")?,
            data: row.try_get("barcode_data")?,
            barcode_type: row.try_get("barcode_type")?,
            name: row.try_get("barcode_name")?,
            fld1: row.try_get("barcode_fld1").ok(),
            fld1_condition: FieldCondition::parse(&row.try_get::<String, _>("fld1_condition").unwrap_or_default()),
            fld1_shift: row.try_get("fld1_shift").ok(),
            fld2: row.try_get("barcode_fld2").ok(),
            fld2_condition: FieldCondition::parse(&row.try_get::<String, _>("fld2_condition").unwrap_or_default()),
            fld2_shift: row.try_get("fld2_shift").ok(),
        })
    }

    pub async fn save_barcode_template(&self, tmpl: &BarcodeTemplate) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO barcode_templates
             (barcode_number, barcode_data, barcode_type, barcode_name,
              barcode_fld1, fld1_condition, fld1_shift,
              barcode_fld2, fld2_condition, fld2_shift)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(tmpl.barcode_number)
        .bind(&tmpl.data)
        .bind(&tmpl.barcode_type)
        .bind(&tmpl.name)
        .bind(&tmpl.fld1)
        .bind(format!("{:?}", tmpl.fld1_condition))
        .bind(&tmpl.fld1_shift)
        .bind(&tmpl.fld2)
        .bind(format!("{:?}", tmpl.fld2_condition))
        .bind(&tmpl.fld2_shift)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_storage() -> Storage {
        let storage = Storage::new("sqlite::memory:").await.expect("connect");
        storage.initialize_tables().await.expect("init");
        storage
    }

    #[tokio::test]
    async fn missing_slot_is_template_not_found() {
        let storage = test_storage().await;
        let err = storage.load_template(7).await.unwrap_err();
        assert!(matches!(err, DriverError::TemplateNotFound(7)));
    }

    #[tokio::test]
    async fn round_trips_a_template_blob() {
        let storage = test_storage().await;
        storage.save_template(3, b"~S 54,40\n").await.unwrap();
        let content = storage.load_template(3).await.unwrap();
        assert_eq!(content, b"~S 54,40\n");
    }

    #[tokio::test]
    async fn barcode_number_out_of_range_is_missing() {
        let storage = test_storage().await;
        let err = storage.load_barcode_template(100).await.unwrap_err();
        assert!(matches!(err, DriverError::BarcodeTemplateMissing(100)));
    }

    #[tokio::test]
    async fn round_trips_a_barcode_template() {
        let storage = test_storage().await;
        let tmpl = BarcodeTemplate {
            barcode_number: 1,
            data: "12L".to_string(),
            barcode_type: "CODE128".to_string(),
            name: "PLU barcode".to_string(),
            fld1: None,
            fld1_condition: FieldCondition::No,
            fld1_shift: None,
            fld2: None,
            fld2_condition: FieldCondition::No,
            fld2_shift: None,
        };
        storage.save_barcode_template(&tmpl).await.unwrap();
        let loaded = storage.load_barcode_template(1).await.unwrap();
        assert_eq!(loaded.data, "12L");
        assert_eq!(loaded.barcode_type, "CODE128");
    }
}
