//! Merged measurement results.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::measurement::{MeasurementName, Sample, standard_names};

/// Every recorded series of a simulation, aligned by timestep.
///
/// Position `i` of every series belongs to `timesteps()[i]`. The module only
/// produces results whose series all have the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementResults {
    timesteps: Vec<u64>,
    series: Vec<(MeasurementName, Vec<Sample>)>,
}

impl MeasurementResults {
    /// Key of the synthetic timestep series.
    pub const TIMESTEP_KEY: &'static str = "timesteps";

    pub(crate) fn new(timesteps: Vec<u64>, series: Vec<(MeasurementName, Vec<Sample>)>) -> Self {
        Self { timesteps, series }
    }

    /// The timestep index series, `[0, 1, ..., N]`.
    pub fn timesteps(&self) -> &[u64] {
        &self.timesteps
    }

    /// Series recorded by the named measurement.
    pub fn get(&self, name: &MeasurementName) -> Option<&[Sample]> {
        self.series
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.as_slice())
    }

    /// Scalar view of a series. Non-scalar and missing samples are `None`.
    pub fn scalar_series(&self, name: &MeasurementName) -> Option<Vec<Option<f64>>> {
        self.get(name).map(|series| {
            series
                .iter()
                .map(|sample| sample.as_ref().and_then(|o| o.as_scalar()))
                .collect()
        })
    }

    /// Measurement names, in registration order.
    pub fn names(&self) -> Vec<&MeasurementName> {
        self.series.iter().map(|(n, _)| n).collect()
    }

    /// Iterate over `(name, series)` pairs, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&MeasurementName, &[Sample])> + '_ {
        self.series.iter().map(|(n, s)| (n, s.as_slice()))
    }

    /// Number of rows (observed timesteps).
    pub fn len(&self) -> usize {
        self.timesteps.len()
    }

    /// Whether nothing has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.timesteps.is_empty()
    }

    /// Number of measurement series, excluding the timestep series.
    pub fn num_series(&self) -> usize {
        self.series.len()
    }
}

impl Serialize for MeasurementResults {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.series.len() + 1))?;
        map.serialize_entry(standard_names::TIMESTEPS.as_str(), &self.timesteps)?;
        for (name, series) in &self.series {
            map.serialize_entry(name.as_str(), series)?;
        }
        map.end()
    }
}
