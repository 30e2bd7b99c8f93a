//! Analytical feature (AF) table of a track.
//!
//! Columns are addressed by name. Reads accept the virtual names `x, y, z, t,
//! timestamp, idx` which are computed from the observations; writes to them fail with
//! [`TrackError::ReservedFeature`].
use std::fmt;

use crate::constants::{is_reserved, DELETE_SENTINEL};
use crate::track::{FeatureValue, Track};
use crate::track_errors::TrackError;

/// Right-hand side of [`Track::assign`].
pub enum AfValue {
    /// A full column, one value per observation
    Column(Vec<f64>),
    /// The same value on every observation
    Constant(f64),
    /// A per-observation algorithm `(track, index) → value`
    Function(Box<dyn Fn(&Track, usize) -> f64>),
    /// An algebraic expression evaluated on the track
    Expression(String),
    /// Remove the feature
    Delete,
}

impl fmt::Debug for AfValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AfValue::Column(c) => write!(f, "Column({} values)", c.len()),
            AfValue::Constant(v) => write!(f, "Constant({v})"),
            AfValue::Function(_) => write!(f, "Function(..)"),
            AfValue::Expression(e) => write!(f, "Expression({e:?})"),
            AfValue::Delete => write!(f, "Delete"),
        }
    }
}

impl From<Vec<f64>> for AfValue {
    fn from(v: Vec<f64>) -> Self {
        AfValue::Column(v)
    }
}

impl From<f64> for AfValue {
    fn from(v: f64) -> Self {
        AfValue::Constant(v)
    }
}

/// `"#DELETE"` is the removal sentinel; any other string is an expression.
impl From<&str> for AfValue {
    fn from(s: &str) -> Self {
        if s == DELETE_SENTINEL {
            AfValue::Delete
        } else {
            AfValue::Expression(s.to_string())
        }
    }
}

impl Track {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn has_analytical_feature(&self, name: &str) -> bool {
        self.feature_index.contains_key(name)
    }

    /// Column index of a stored AF.
    pub fn feature_index_of(&self, name: &str) -> Result<usize, TrackError> {
        self.feature_index
            .get(name)
            .copied()
            .ok_or_else(|| TrackError::UnknownFeature(name.to_string()))
    }

    fn check_writable(&self, name: &str) -> Result<(), TrackError> {
        if is_reserved(name) {
            return Err(TrackError::ReservedFeature(name.to_string()));
        }
        if name.is_empty() {
            return Err(TrackError::UnknownFeature(name.to_string()));
        }
        Ok(())
    }

    fn check_column_len(&self, len: usize) -> Result<(), TrackError> {
        if len != self.size() {
            return Err(TrackError::SizeError(format!(
                "column of {len} values for a track of {} observations",
                self.size()
            )));
        }
        Ok(())
    }

    /// Create a new AF holding arbitrary values.
    ///
    /// Errors
    /// ------
    /// * [`TrackError::FeatureAlreadyExists`] when the name is taken,
    /// * [`TrackError::ReservedFeature`] for a virtual name,
    /// * [`TrackError::SizeError`] when `values` is not one value per observation.
    pub fn create_feature_values(
        &mut self,
        name: &str,
        values: Vec<FeatureValue>,
    ) -> Result<(), TrackError> {
        self.check_writable(name)?;
        if self.has_analytical_feature(name) {
            return Err(TrackError::FeatureAlreadyExists(name.to_string()));
        }
        self.check_column_len(values.len())?;
        self.feature_index
            .insert(name.to_string(), self.feature_names.len());
        self.feature_names.push(name.to_string());
        for (o, v) in self.observations.iter_mut().zip(values) {
            o.features.push(v);
        }
        Ok(())
    }

    /// Create a new numeric AF.
    pub fn create_analytical_feature(&mut self, name: &str, values: Vec<f64>) -> Result<(), TrackError> {
        self.create_feature_values(name, values.into_iter().map(FeatureValue::Num).collect())
    }

    /// Create a new AF with the same value on every observation.
    pub fn create_constant_feature(&mut self, name: &str, value: FeatureValue) -> Result<(), TrackError> {
        self.create_feature_values(name, vec![value; self.size()])
    }

    /// Overwrite an existing AF.
    pub fn update_feature_values(
        &mut self,
        name: &str,
        values: Vec<FeatureValue>,
    ) -> Result<(), TrackError> {
        self.check_writable(name)?;
        let k = self.feature_index_of(name)?;
        self.check_column_len(values.len())?;
        for (o, v) in self.observations.iter_mut().zip(values) {
            o.features[k] = v;
        }
        Ok(())
    }

    pub fn update_analytical_feature(&mut self, name: &str, values: Vec<f64>) -> Result<(), TrackError> {
        self.update_feature_values(name, values.into_iter().map(FeatureValue::Num).collect())
    }

    /// Create or overwrite a numeric AF.
    pub fn set_analytical_feature(&mut self, name: &str, values: Vec<f64>) -> Result<(), TrackError> {
        if self.has_analytical_feature(name) {
            self.update_analytical_feature(name, values)
        } else {
            self.create_analytical_feature(name, values)
        }
    }

    /// Evaluate `algo(track, i)` on every observation and store the result in `name`
    /// (created if needed).
    pub fn add_analytical_feature<F>(&mut self, name: &str, algo: F) -> Result<(), TrackError>
    where
        F: Fn(&Track, usize) -> f64,
    {
        self.check_writable(name)?;
        let values: Vec<f64> = (0..self.size()).map(|i| algo(self, i)).collect();
        self.set_analytical_feature(name, values)
    }

    pub fn remove_analytical_feature(&mut self, name: &str) -> Result<(), TrackError> {
        self.check_writable(name)?;
        let k = self.feature_index_of(name)?;
        self.feature_names.remove(k);
        for o in self.observations.iter_mut() {
            o.features.remove(k);
        }
        self.reindex();
        Ok(())
    }

    /// Rename a stored AF.
    pub fn rename_analytical_feature(&mut self, old: &str, new: &str) -> Result<(), TrackError> {
        self.check_writable(new)?;
        let k = self.feature_index_of(old)?;
        if self.has_analytical_feature(new) {
            return Err(TrackError::FeatureAlreadyExists(new.to_string()));
        }
        self.feature_names[k] = new.to_string();
        self.reindex();
        Ok(())
    }

    /// Numeric column of an AF (stored or virtual). Text values read as `NaN`.
    pub fn get_analytical_feature(&self, name: &str) -> Result<Vec<f64>, TrackError> {
        match name {
            "x" => Ok(self.get_x()),
            "y" => Ok(self.get_y()),
            "z" => Ok(self.get_z()),
            "t" | "timestamp" => Ok(self.get_t()),
            "idx" => Ok((0..self.size()).map(|i| i as f64).collect()),
            _ => {
                let k = self.feature_index_of(name)?;
                Ok(self
                    .observations
                    .iter()
                    .map(|o| o.features[k].as_f64())
                    .collect())
            }
        }
    }

    /// Raw column of an AF, text values included.
    pub fn get_feature_values(&self, name: &str) -> Result<Vec<FeatureValue>, TrackError> {
        if is_reserved(name) {
            return Ok(self
                .get_analytical_feature(name)?
                .into_iter()
                .map(FeatureValue::Num)
                .collect());
        }
        let k = self.feature_index_of(name)?;
        Ok(self
            .observations
            .iter()
            .map(|o| o.features[k].clone())
            .collect())
    }

    /// `true` when at least one value of the stored AF is text.
    pub fn is_text_feature(&self, name: &str) -> Result<bool, TrackError> {
        if is_reserved(name) {
            return Ok(false);
        }
        let k = self.feature_index_of(name)?;
        Ok(self.observations.iter().any(|o| o.features[k].is_text()))
    }

    /// Value of an AF on observation `i`.
    pub fn get_obs_analytical_feature(&self, name: &str, i: usize) -> Result<f64, TrackError> {
        let obs = self.get_obs(i)?;
        Ok(match name {
            "x" => obs.position.x(),
            "y" => obs.position.y(),
            "z" => obs.position.z(),
            "t" | "timestamp" => obs.timestamp.to_abs_time(),
            "idx" => i as f64,
            _ => obs.features[self.feature_index_of(name)?].as_f64(),
        })
    }

    pub fn get_obs_feature_value(&self, name: &str, i: usize) -> Result<FeatureValue, TrackError> {
        if is_reserved(name) {
            return self.get_obs_analytical_feature(name, i).map(FeatureValue::Num);
        }
        let k = self.feature_index_of(name)?;
        Ok(self.get_obs(i)?.features[k].clone())
    }

    pub fn set_obs_analytical_feature(
        &mut self,
        name: &str,
        i: usize,
        value: impl Into<FeatureValue>,
    ) -> Result<(), TrackError> {
        self.check_writable(name)?;
        let k = self.feature_index_of(name)?;
        self.get_obs_mut(i)?.features[k] = value.into();
        Ok(())
    }

    /// Dispatch an assignment `track[name] = value`.
    ///
    /// * a column or constant creates the AF, or updates it when it exists,
    /// * a function is evaluated on every observation,
    /// * an expression is evaluated by the algebra evaluator and stored in `name`,
    /// * [`AfValue::Delete`] removes the AF.
    pub fn assign(&mut self, name: &str, value: impl Into<AfValue>) -> Result<(), TrackError> {
        match value.into() {
            AfValue::Column(values) => self.set_analytical_feature(name, values),
            AfValue::Constant(v) => self.set_analytical_feature(name, vec![v; self.size()]),
            AfValue::Function(f) => self.add_analytical_feature(name, f),
            AfValue::Expression(expr) => {
                let column = self.eval(&expr)?;
                self.set_analytical_feature(name, column)
            }
            AfValue::Delete => self.remove_analytical_feature(name),
        }
    }
}

#[cfg(test)]
mod features_test {
    use super::*;
    use crate::track::enu_track;

    fn track() -> Track {
        enu_track(&[(0., 0., 0.), (1., 0., 0.), (1., 1., 0.), (2., 1., 0.)], 1.0)
    }

    #[test]
    fn test_create_update_remove() {
        let mut t = track();
        t.create_analytical_feature("a", vec![1., 2., 3., 4.]).unwrap();
        assert_eq!(
            t.create_analytical_feature("a", vec![0.; 4]).unwrap_err(),
            TrackError::FeatureAlreadyExists("a".into())
        );
        t.update_analytical_feature("a", vec![4., 3., 2., 1.]).unwrap();
        assert_eq!(t.get_analytical_feature("a").unwrap(), vec![4., 3., 2., 1.]);
        assert!(t.update_analytical_feature("b", vec![0.; 4]).is_err());
        assert!(t.create_analytical_feature("b", vec![0.; 3]).is_err());

        t.create_analytical_feature("b", vec![0.; 4]).unwrap();
        t.remove_analytical_feature("a").unwrap();
        assert_eq!(t.feature_names(), &["b".to_string()]);
        assert_eq!(t.get_obs_analytical_feature("b", 2).unwrap(), 0.0);
        assert!(t.get_analytical_feature("a").is_err());
    }

    #[test]
    fn test_virtual_features() {
        let t = track();
        assert_eq!(t.get_analytical_feature("x").unwrap(), vec![0., 1., 1., 2.]);
        assert_eq!(t.get_analytical_feature("idx").unwrap(), vec![0., 1., 2., 3.]);
        assert_eq!(t.get_analytical_feature("t").unwrap(), vec![0., 1., 2., 3.]);
        assert_eq!(t.get_obs_analytical_feature("y", 2).unwrap(), 1.0);
        let mut t = t;
        assert_eq!(
            t.create_analytical_feature("x", vec![0.; 4]).unwrap_err(),
            TrackError::ReservedFeature("x".into())
        );
    }

    #[test]
    fn test_column_length_matches_size() {
        let mut t = track();
        t.add_analytical_feature("double_x", |tr, i| 2.0 * tr.get_obs(i).unwrap().position.x())
            .unwrap();
        for name in ["double_x", "x", "idx"] {
            assert_eq!(t.get_analytical_feature(name).unwrap().len(), t.size());
        }
        assert_eq!(t.get_analytical_feature("double_x").unwrap(), vec![0., 2., 2., 4.]);
    }

    #[test]
    fn test_assign_dispatch() {
        let mut t = track();
        t.assign("c", 2.0).unwrap();
        assert_eq!(t.get_analytical_feature("c").unwrap(), vec![2.0; 4]);
        t.assign("c", vec![1., 2., 3., 4.]).unwrap();
        t.assign("d", AfValue::Function(Box::new(|tr: &Track, i: usize| {
            tr.get_obs_analytical_feature("c", i).unwrap() * 10.0
        })))
            .unwrap();
        assert_eq!(t.get_analytical_feature("d").unwrap(), vec![10., 20., 30., 40.]);
        t.assign("c", "#DELETE").unwrap();
        assert!(!t.has_analytical_feature("c"));
    }

    #[test]
    fn test_text_features() {
        let mut t = track();
        t.create_constant_feature("mode", FeatureValue::from("walk")).unwrap();
        assert!(t.is_text_feature("mode").unwrap());
        assert!(t.get_analytical_feature("mode").unwrap()[0].is_nan());
        assert_eq!(
            t.get_obs_feature_value("mode", 1).unwrap(),
            FeatureValue::from("walk")
        );
        t.set_obs_analytical_feature("mode", 1, "bike").unwrap();
        assert_eq!(t.get_feature_values("mode").unwrap()[1], FeatureValue::from("bike"));
        t.rename_analytical_feature("mode", "transport").unwrap();
        assert!(t.has_analytical_feature("transport"));
    }
}
