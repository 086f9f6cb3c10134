use anyhow::{Context, Result};
use rusqlite::params;

use crate::db::{
    helpers::{parse_datetime, to_brightness, to_i64, to_u32},
    Database,
};
use crate::models::CalibrationPoint;
use crate::ports::CalibrationPersistence;

impl Database {
    /// All calibration points in stored order.
    ///
    /// A single undecodable row fails the whole load.
    pub async fn load_calibration_points(&self) -> Result<Vec<CalibrationPoint>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT lux, brightness, recorded_at
                 FROM calibration_points
                 ORDER BY position ASC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()
                .context("failed to read calibration rows")?;

            rows.into_iter()
                .map(|(lux, brightness, recorded_at)| -> Result<CalibrationPoint> {
                    Ok(CalibrationPoint::new(
                        to_u32(lux, "lux")?,
                        to_brightness(brightness)?,
                        parse_datetime(&recorded_at, "recorded_at")?,
                    ))
                })
                .collect()
        })
        .await
    }

    /// Replace the stored set in one transaction.
    pub async fn replace_calibration_points(&self, points: Vec<CalibrationPoint>) -> Result<()> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open calibration transaction")?;

            tx.execute("DELETE FROM calibration_points", [])
                .context("failed to clear calibration points")?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO calibration_points (position, lux, brightness, recorded_at)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (position, point) in points.iter().enumerate() {
                    stmt.execute(params![
                        to_i64(position)?,
                        i64::from(point.lux),
                        i64::from(point.brightness),
                        point.recorded_at.to_rfc3339(),
                    ])
                    .with_context(|| format!("failed to insert calibration point at {} lux", point.lux))?;
                }
            }

            tx.commit().context("failed to commit calibration points")?;
            Ok(())
        })
        .await
    }
}

impl CalibrationPersistence for Database {
    async fn load(&self) -> Result<Vec<CalibrationPoint>> {
        self.load_calibration_points().await
    }

    async fn save(&self, points: &[CalibrationPoint]) -> Result<()> {
        self.replace_calibration_points(points.to_vec()).await
    }
}
