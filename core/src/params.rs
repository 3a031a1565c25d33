use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Loss variant understood by the underlying classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loss {
    Hs,
    Ns,
    Softmax,
}

impl FromStr for Loss {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hs" => Ok(Loss::Hs),
            "ns" => Ok(Loss::Ns),
            "softmax" => Ok(Loss::Softmax),
            _ => Err(()),
        }
    }
}

/// Training and suggestion hyperparameters. Every field has a declared
/// primitive type; [`TrainParams::apply`] coerces string configuration
/// values into them and silently ignores unrecognized keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainParams {
    /// Learning rate.
    pub lr: f64,
    /// Embedding dimension.
    pub dim: usize,
    /// Training epochs.
    pub epoch: usize,
    /// Loss variant.
    pub loss: Loss,
    /// Token n-gram sizes fed to the classifier, 1 = unigrams only.
    pub word_ngrams: usize,
    /// Minimum term occurrence count kept in the vocabulary.
    pub min_count: usize,
    /// Thread count hint for the underlying training routine.
    pub thread: usize,
    /// Maximum whitespace tokens per document chunk.
    pub chunksize: usize,
    /// Maximum number of suggestions returned.
    pub limit: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            lr: 0.25,
            dim: 100,
            epoch: 5,
            loss: Loss::Hs,
            word_ngrams: 1,
            min_count: 1,
            thread: 1,
            chunksize: 100,
            limit: 10,
        }
    }
}

impl TrainParams {
    /// Apply a string configuration map on top of the current values.
    /// Recognized keys are coerced to their declared type; a value that
    /// does not parse is an error; unrecognized keys are ignored.
    pub fn apply(&mut self, config: &HashMap<String, String>) -> Result<()> {
        for (key, value) in config {
            match key.as_str() {
                "lr" => self.lr = parse(key, value)?,
                "dim" => self.dim = parse(key, value)?,
                "epoch" => self.epoch = parse(key, value)?,
                "loss" => {
                    self.loss = value.parse().map_err(|_| Error::InvalidParameter {
                        key: key.clone(),
                        value: value.clone(),
                    })?
                }
                "wordNgrams" => self.word_ngrams = parse(key, value)?,
                "minCount" => self.min_count = parse(key, value)?,
                "thread" => self.thread = parse(key, value)?,
                "chunksize" => self.chunksize = parse(key, value)?,
                "limit" => self.limit = parse(key, value)?,
                _ => tracing::debug!(key = %key, "ignoring unrecognized parameter"),
            }
        }
        Ok(())
    }

    pub fn from_config(config: &HashMap<String, String>) -> Result<Self> {
        let mut params = Self::default();
        params.apply(config)?;
        Ok(params)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::InvalidParameter {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn recognized_keys_are_coerced() {
        let params = TrainParams::from_config(&config(&[
            ("lr", "0.5"),
            ("dim", "32"),
            ("loss", "softmax"),
            ("chunksize", "20"),
        ]))
        .unwrap();
        assert_eq!(params.lr, 0.5);
        assert_eq!(params.dim, 32);
        assert_eq!(params.loss, Loss::Softmax);
        assert_eq!(params.chunksize, 20);
        // untouched keys keep their defaults
        assert_eq!(params.epoch, 5);
    }

    #[test]
    fn unrecognized_keys_are_ignored() {
        let params = TrainParams::from_config(&config(&[("bogus", "1"), ("lr", "0.1")])).unwrap();
        assert_eq!(params.lr, 0.1);
    }

    #[test]
    fn bad_value_is_an_error() {
        let err = TrainParams::from_config(&config(&[("dim", "not-a-number")])).unwrap_err();
        match err {
            Error::InvalidParameter { key, .. } => assert_eq!(key, "dim"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
