//! Sector reports: one narrow, date-ascending row list per concern

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::{ensure_active, ReportAggregationService};
use crate::error::Result;
use crate::timeseries::{self, daily_consumption};
use crate::types::{
    AirQualityReading, ConsumptionRow, DailyConsumption, DailyFeedRecord, DailyWaterRecord,
    FarmId, RecordScope, SanitaryEvent, SanitaryRow, SensorRow, WeeklyWeighingRecord, WeighingRow,
};

fn per_bird(total: f64, birds: u32) -> f64 {
    if birds == 0 {
        0.0
    } else {
        total * 1000.0 / f64::from(birds)
    }
}

impl From<&DailyConsumption> for ConsumptionRow {
    fn from(d: &DailyConsumption) -> Self {
        Self {
            batch_id: d.batch_id,
            date: d.date,
            feed_kg: d.feed_kg,
            water_l: d.water_l,
            live_birds: if d.feed_live_birds > 0 {
                d.feed_live_birds
            } else {
                d.water_live_birds
            },
            feed_per_bird_g: per_bird(d.feed_kg, d.feed_live_birds),
            water_per_bird_ml: per_bird(d.water_l, d.water_live_birds),
        }
    }
}

impl From<&SanitaryEvent> for SanitaryRow {
    fn from(e: &SanitaryEvent) -> Self {
        Self {
            batch_id: e.batch_id,
            date: e.date,
            event_type: e.event_type,
            product: e.product.clone(),
            route: e.route.clone(),
            dosage: e.dosage.clone(),
            cost: e.cost,
        }
    }
}

impl From<&AirQualityReading> for SensorRow {
    fn from(r: &AirQualityReading) -> Self {
        Self {
            batch_id: r.batch_id,
            timestamp: r.timestamp,
            temperature_c: r.temperature_c,
            humidity_percent: r.humidity_percent,
            ammonia_ppm: r.ammonia_ppm,
            co2_ppm: r.co2_ppm,
            o2_percent: r.o2_percent,
        }
    }
}

impl ReportAggregationService {
    /// Daily feed and water per batch, one row per (date, batch)
    pub async fn consumption_report(
        &self,
        farm_id: FarmId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<ConsumptionRow>> {
        let (_, window) = self.open(farm_id, start, end, cancel).await?;
        let scope = RecordScope::Farm(farm_id);
        let feed: Vec<DailyFeedRecord> =
            self.aggregator.fetch(scope, Some(window.dates), cancel).await?;
        let water: Vec<DailyWaterRecord> =
            self.aggregator.fetch(scope, Some(window.dates), cancel).await?;
        ensure_active(cancel)?;

        Ok(daily_consumption(&feed, &water)
            .iter()
            .map(ConsumptionRow::from)
            .collect())
    }

    /// Weighings with the reference weight, CV and uniformity alongside
    pub async fn weighing_report(
        &self,
        farm_id: FarmId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WeighingRow>> {
        let (_, window) = self.open(farm_id, start, end, cancel).await?;
        let weighings: Vec<WeeklyWeighingRecord> = self
            .aggregator
            .fetch(RecordScope::Farm(farm_id), Some(window.dates), cancel)
            .await?;
        ensure_active(cancel)?;

        let tolerance = self.aggregator.uniformity_tolerance();
        Ok(weighings
            .iter()
            .map(|w| WeighingRow {
                batch_id: w.batch_id,
                date: w.date,
                age_days: w.age_days,
                sample_size: w.sample_size,
                mean_weight_g: w.mean_weight_g,
                standard_weight_g: self.projector.standard_at(w.age_days),
                cv_percent: timeseries::weighing_cv(w),
                uniformity_percent: timeseries::weighing_uniformity(w, tolerance),
            })
            .collect())
    }

    pub async fn sanitary_report(
        &self,
        farm_id: FarmId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SanitaryRow>> {
        let (_, window) = self.open(farm_id, start, end, cancel).await?;
        let events: Vec<SanitaryEvent> = self
            .aggregator
            .fetch(RecordScope::Farm(farm_id), Some(window.dates), cancel)
            .await?;
        ensure_active(cancel)?;
        Ok(events.iter().map(SanitaryRow::from).collect())
    }

    /// Raw sensor readings whose timestamp lies inside `[start, end]`
    pub async fn sensor_report(
        &self,
        farm_id: FarmId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SensorRow>> {
        let (_, window) = self.open(farm_id, start, end, cancel).await?;
        let readings: Vec<AirQualityReading> = self
            .aggregator
            .fetch(RecordScope::Farm(farm_id), Some(window.dates), cancel)
            .await?;
        ensure_active(cancel)?;
        Ok(readings
            .iter()
            .filter(|r| window.contains(r.timestamp))
            .map(SensorRow::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::date;

    #[test]
    fn test_consumption_row_per_bird_units() {
        let day = DailyConsumption {
            batch_id: 1,
            date: date(2024, 3, 3),
            feed_kg: 30.0,
            feed_live_birds: 600,
            water_l: 60.0,
            water_live_birds: 600,
        };
        let row = ConsumptionRow::from(&day);
        assert_eq!(row.feed_per_bird_g, 50.0);
        assert_eq!(row.water_per_bird_ml, 100.0);
        assert_eq!(row.live_birds, 600);
    }

    #[test]
    fn test_water_only_day_uses_water_population() {
        let day = DailyConsumption {
            batch_id: 1,
            date: date(2024, 3, 3),
            feed_kg: 0.0,
            feed_live_birds: 0,
            water_l: 50.0,
            water_live_birds: 500,
        };
        let row = ConsumptionRow::from(&day);
        assert_eq!(row.live_birds, 500);
        assert_eq!(row.feed_per_bird_g, 0.0);
    }
}
