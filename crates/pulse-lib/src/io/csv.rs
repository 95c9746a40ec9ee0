#[cfg(feature = "polars")]
pub mod polars_io {
    use crate::workout::{Column, WorkoutRecord};
    use anyhow::Result;
    use polars::prelude::*;

    /// Load a workout CSV through polars. Same column conventions as
    /// [`crate::io::workout::read_workout_csv`], matched case-sensitively.
    pub fn load_workout(path: &str) -> Result<WorkoutRecord> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.into()))?
            .finish()?;
        let mut time_s: Vec<f64> = match first_column(&df, &["time_seconds", "time", "Time"])? {
            Some(col) => col.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
            None => (0..df.height()).map(|i| i as f64).collect(),
        };
        if let Some(&start) = time_s.first() {
            time_s.iter_mut().for_each(|t| *t -= start);
        }
        Ok(WorkoutRecord {
            time_s,
            heart_rate: first_column(&df, &["heart_rate", "HeartRate"])?,
            power: first_column(&df, &["power", "PowerOriginal"])?,
            distance: first_column(&df, &["distance"])?,
            altitude: first_column(&df, &["altitude"])?,
        })
    }

    fn first_column(df: &DataFrame, names: &[&str]) -> Result<Option<Column>> {
        for name in names {
            if let Ok(s) = df.column(name) {
                let s = s.cast(&DataType::Float64)?;
                return Ok(Some(s.f64()?.into_iter().collect()));
            }
        }
        Ok(None)
    }

}
