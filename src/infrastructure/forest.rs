//! Random-forest model backend (smartcore).
//!
//! The lifecycle only ever sees flattened normalized windows; how the
//! regression is done lives entirely behind [`ModelBackend`], so the
//! technique can be swapped without touching windowing or scaling.

use crate::domain::ports::{ModelBackend, PriceModel};
use anyhow::{Context, Result};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

pub struct ForestBackend {
    n_trees: usize,
    max_depth: u16,
    min_samples_split: usize,
}

impl ForestBackend {
    pub fn new(n_trees: usize, max_depth: u16, min_samples_split: usize) -> Self {
        Self {
            n_trees,
            max_depth,
            min_samples_split,
        }
    }
}

impl Default for ForestBackend {
    fn default() -> Self {
        Self::new(100, 10, 5)
    }
}

impl ModelBackend for ForestBackend {
    fn fit(&self, x: &[Vec<f64>], y: &[f64]) -> Result<Box<dyn PriceModel>> {
        let matrix = DenseMatrix::from_2d_vec(&x.to_vec())
            .map_err(|e| anyhow::anyhow!("Matrix creation failed: {}", e))?;
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.n_trees)
            .with_max_depth(self.max_depth)
            .with_min_samples_split(self.min_samples_split);
        let forest = Forest::fit(&matrix, &y.to_vec(), params)
            .map_err(|e| anyhow::anyhow!("Training failed: {}", e))?;
        Ok(Box::new(ForestModel { forest }))
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<Box<dyn PriceModel>> {
        let forest: Forest =
            serde_json::from_slice(bytes).context("Failed to deserialize forest model")?;
        Ok(Box::new(ForestModel { forest }))
    }
}

struct ForestModel {
    forest: Forest,
}

impl PriceModel for ForestModel {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let matrix = DenseMatrix::from_2d_vec(&x.to_vec())
            .map_err(|e| anyhow::anyhow!("Matrix creation failed: {}", e))?;
        self.forest
            .predict(&matrix)
            .map_err(|e| anyhow::anyhow!("Prediction failed: {}", e))
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.forest).context("Failed to serialize forest model")
    }
}
