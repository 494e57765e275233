//! Tensor serialization.
//!
//! Two forms with round-trip equality: a human-readable JSON text form
//! (`show`/`parse`) and a compact binary form (`dump`/`load`). Both
//! serialize the rank, edges (arrow and segments), names, and the flat
//! storage in block-major order; the block table is rebuilt on read and
//! validated against the storage length.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core_impl::Core;
use crate::edge::Edge;
use crate::error::{Error, Result};
use crate::name::Name;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

#[derive(Serialize)]
struct TensorDataRef<'a, T, S: Symmetry, N> {
    names: &'a [N],
    edges: &'a [Edge<S>],
    storage: &'a [T],
}

#[derive(Deserialize)]
#[serde(bound = "T: DeserializeOwned, S: Symmetry + DeserializeOwned, N: DeserializeOwned")]
struct TensorData<T, S: Symmetry, N> {
    names: Vec<N>,
    edges: Vec<Edge<S>>,
    storage: Vec<T>,
}

impl<T, S, N> Tensor<T, S, N>
where
    T: Scalar + Serialize + DeserializeOwned,
    S: Symmetry + Serialize + DeserializeOwned,
    N: Name + Serialize + DeserializeOwned,
{
    fn data_ref(&self) -> TensorDataRef<'_, T, S, N> {
        TensorDataRef {
            names: self.names(),
            edges: self.core().edges(),
            storage: self.storage(),
        }
    }

    fn from_data(data: TensorData<T, S, N>) -> Result<Self> {
        let core = Core::from_parts(data.edges, data.storage).ok_or_else(|| {
            Error::CorruptData("storage length does not match the block table".to_string())
        })?;
        Tensor::from_core(data.names, core)
    }

    /// Serialize to the human-readable text form.
    pub fn show(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.data_ref())?)
    }

    /// Parse the text form produced by [`Tensor::show`].
    pub fn parse(text: &str) -> Result<Self> {
        Self::from_data(serde_json::from_str(text)?)
    }

    /// Serialize to the binary form.
    pub fn dump(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.data_ref())?)
    }

    /// Load the binary form produced by [`Tensor::dump`].
    pub fn load(bytes: &[u8]) -> Result<Self> {
        Self::from_data(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetry::FermiSymmetry;

    fn sample() -> Tensor<f64, FermiSymmetry> {
        let mut t = Tensor::new(
            vec!["i".to_string(), "j".to_string()],
            vec![
                Edge::with_arrow(vec![(FermiSymmetry(-1), 2), (FermiSymmetry(1), 1)], true),
                Edge::with_arrow(vec![(FermiSymmetry(-1), 2), (FermiSymmetry(1), 3)], false),
            ],
        )
        .unwrap();
        t.range(0.5, 1.0);
        t
    }

    #[test]
    fn text_roundtrip() {
        let t = sample();
        let text = t.show().unwrap();
        let back: Tensor<f64, FermiSymmetry> = Tensor::parse(&text).unwrap();
        assert_eq!(back.names(), t.names());
        assert_eq!(back.core().edges(), t.core().edges());
        assert_eq!(back.storage(), t.storage());
    }

    #[test]
    fn binary_roundtrip() {
        let t = sample();
        let bytes = t.dump().unwrap();
        let back: Tensor<f64, FermiSymmetry> = Tensor::load(&bytes).unwrap();
        assert_eq!(back.names(), t.names());
        assert_eq!(back.core().edges(), t.core().edges());
        assert_eq!(back.storage(), t.storage());
    }

    #[test]
    fn truncated_storage_is_rejected() {
        let t = sample();
        let text = t.show().unwrap();
        let broken = text.replacen("0.5", "0.5,0.25", 1);
        let result: Result<Tensor<f64, FermiSymmetry>> = Tensor::parse(&broken);
        assert!(result.is_err());
    }
}
