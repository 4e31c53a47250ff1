use crate::model::{DetectedObject, DetectionResult, ImageRecord, StorageError, StoreImage, Verdict};
use crate::utils::timestamp;
use chrono::Utc;
use rusqlite::{params, Connection, Row};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ANALYSED: &str = "analysed";
pub const STATUS_ERROR: &str = "error";

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database file and runs the migrations.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        // "emptyy" is the column name downstream report queries expect
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS storeassignments (
                assignment_id INTEGER PRIMARY KEY AUTOINCREMENT,
                status TEXT NOT NULL DEFAULT 'pending',
                analysed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS storeassignmentimages (
                image_id INTEGER PRIMARY KEY AUTOINCREMENT,
                assignment_id INTEGER NOT NULL REFERENCES storeassignments(assignment_id),
                image_url TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                found_sga_photo TEXT,
                auditable_photo TEXT,
                purity TEXT,
                chargeability REAL,
                abused TEXT,
                emptyy TEXT,
                non_coca_cola_products TEXT,
                detected_objects TEXT,
                error TEXT,
                analysed_at TEXT
            );
            ",
        )?;

        Ok(Self { conn })
    }

    pub fn add_assignment(&self) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO storeassignments (status) VALUES (?1)",
            params![STATUS_PENDING],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn add_image(&self, assignment_id: i64, image_url: &str) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO storeassignmentimages (assignment_id, image_url, status) VALUES (?1, ?2, ?3)",
            params![assignment_id, image_url, STATUS_PENDING],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn assignment_status(&self, assignment_id: i64) -> Result<String, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT status FROM storeassignments WHERE assignment_id = ?1")?;
        let mut rows = stmt.query(params![assignment_id])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Err(StorageError::NotFound(format!("assignment {}", assignment_id))),
        }
    }

    /// Images uploaded for an assignment, oldest first.
    pub fn get_images(&self, assignment_id: i64) -> Result<Vec<StoreImage>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT image_id, image_url FROM storeassignmentimages
             WHERE assignment_id = ?1 ORDER BY image_id ASC",
        )?;

        let rows = stmt.query_map(params![assignment_id], |row| {
            Ok(StoreImage {
                image_id: row.get(0)?,
                image_url: row.get(1)?,
            })
        })?;

        let mut images = Vec::new();
        for image in rows {
            images.push(image?);
        }
        Ok(images)
    }

    /// Writes a verdict into the image row and marks it analysed.
    pub fn save_image_verdict(
        &self,
        image_id: i64,
        detection: &DetectionResult,
        verdict: &Verdict,
    ) -> Result<(), StorageError> {
        let non_matching = serde_json::to_string(&verdict.non_coca_cola_products)?;
        let objects = serde_json::to_string(&detection.objects)?;

        let updated = self.conn.execute(
            "UPDATE storeassignmentimages
             SET status = ?1,
                 auditable_photo = ?2,
                 purity = ?3,
                 chargeability = ?4,
                 abused = ?5,
                 emptyy = ?6,
                 non_coca_cola_products = ?7,
                 detected_objects = ?8,
                 error = NULL,
                 analysed_at = ?9
             WHERE image_id = ?10",
            params![
                STATUS_ANALYSED,
                verdict.auditable.as_ref().map(|a| a.to_string()),
                verdict.purity.to_string(),
                verdict.chargeability_percentage.as_ref().and_then(|n| n.as_f64()),
                verdict.abused.to_string(),
                verdict.empty.to_string(),
                non_matching,
                objects,
                timestamp(Utc::now()),
                image_id,
            ],
        )?;

        Self::expect_one(updated, "image", image_id)
    }

    /// Records a per-image failure without touching earlier analysis columns.
    pub fn mark_image_failed(&self, image_id: i64, reason: &str) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE storeassignmentimages SET status = ?1, error = ?2, analysed_at = ?3
             WHERE image_id = ?4",
            params![STATUS_ERROR, reason, timestamp(Utc::now()), image_id],
        )?;

        Self::expect_one(updated, "image", image_id)
    }

    pub fn mark_assignment_analysed(&self, assignment_id: i64) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE storeassignments SET status = ?1, analysed_at = ?2 WHERE assignment_id = ?3",
            params![STATUS_ANALYSED, timestamp(Utc::now()), assignment_id],
        )?;

        Self::expect_one(updated, "assignment", assignment_id)
    }

    pub fn get_image_records(&self, assignment_id: i64) -> Result<Vec<ImageRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT image_id, image_url, status, auditable_photo, purity, chargeability,
                    abused, emptyy, detected_objects, error
             FROM storeassignmentimages WHERE assignment_id = ?1 ORDER BY image_id ASC",
        )?;

        let rows = stmt.query_map(params![assignment_id], Self::map_record)?;
        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    fn expect_one(updated: usize, what: &str, id: i64) -> Result<(), StorageError> {
        if updated == 0 {
            Err(StorageError::NotFound(format!("{} {}", what, id)))
        } else {
            Ok(())
        }
    }

    fn map_record(row: &Row) -> Result<ImageRecord, rusqlite::Error> {
        let objects_json: Option<String> = row.get(8)?;
        let detected_objects = match objects_json {
            Some(json) => serde_json::from_str::<Vec<DetectedObject>>(&json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
            })?,
            None => Vec::new(),
        };

        Ok(ImageRecord {
            image_id: row.get(0)?,
            image_url: row.get(1)?,
            status: row.get(2)?,
            auditable_photo: row.get(3)?,
            purity: row.get(4)?,
            chargeability: row.get(5)?,
            abused: row.get(6)?,
            emptyy: row.get(7)?,
            detected_objects,
            error: row.get(9)?,
        })
    }
}
