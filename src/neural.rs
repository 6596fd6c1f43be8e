//! Feed-forward brains for animals.
//!
//! Fixed-topology two-layer networks: input -> ReLU hidden -> output clamped
//! to [0, 1]. Supports random weight perturbation (used both by genome
//! evolution and by the in-lifetime exploration loop) and a small
//! reward-weighted local update.

use crate::util::randn;
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A two-layer feed-forward network with fixed dimensions.
#[derive(Clone, Debug)]
pub struct NeuralNet {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    /// Input-to-hidden weights, indexed [input][hidden].
    pub weights_ih: Array2<f64>,
    pub bias_h: Array1<f64>,
    /// Hidden-to-output weights, indexed [hidden][output].
    pub weights_ho: Array2<f64>,
    pub bias_o: Array1<f64>,
    /// Hidden activations from the most recent forward pass.
    last_hidden: Array1<f64>,
}

impl NeuralNet {
    /// Create a network with weights and biases drawn from N(0, 0.5²).
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        rng: &mut R,
    ) -> Self {
        Self {
            input_size,
            hidden_size,
            output_size,
            weights_ih: Array2::from_shape_fn((input_size, hidden_size), |_| randn(rng) * 0.5),
            bias_h: Array1::from_shape_fn(hidden_size, |_| randn(rng) * 0.5),
            weights_ho: Array2::from_shape_fn((hidden_size, output_size), |_| randn(rng) * 0.5),
            bias_o: Array1::from_shape_fn(output_size, |_| randn(rng) * 0.5),
            last_hidden: Array1::zeros(hidden_size),
        }
    }

    /// Forward pass. Hidden activations are rectified, outputs clamped to
    /// [0, 1]. The hidden layer is retained for [`NeuralNet::learn`].
    pub fn forward(&mut self, inputs: &[f64]) -> Vec<f64> {
        debug_assert_eq!(inputs.len(), self.input_size);

        let x = ArrayView1::from(inputs);
        let mut hidden = x.dot(&self.weights_ih) + &self.bias_h;
        hidden.mapv_inplace(|v| v.max(0.0));

        let mut out = hidden.dot(&self.weights_ho) + &self.bias_o;
        out.mapv_inplace(|v| v.clamp(0.0, 1.0));

        self.last_hidden = hidden;
        out.to_vec()
    }

    /// Perturb each parameter independently with probability `rate` by a
    /// Gaussian step of magnitude 0.06.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, rng: &mut R) {
        for w in self.weights_ih.iter_mut() {
            if rng.gen::<f64>() < rate {
                *w += randn(rng) * 0.06;
            }
        }
        for b in self.bias_h.iter_mut() {
            if rng.gen::<f64>() < rate {
                *b += randn(rng) * 0.06;
            }
        }
        for w in self.weights_ho.iter_mut() {
            if rng.gen::<f64>() < rate {
                *w += randn(rng) * 0.06;
            }
        }
        for b in self.bias_o.iter_mut() {
            if rng.gen::<f64>() < rate {
                *b += randn(rng) * 0.06;
            }
        }
    }

    /// Reward-weighted Hebbian-style update using the hidden activations of
    /// the most recent forward pass.
    pub fn learn(&mut self, inputs: &[f64], outputs: &[f64], reward: f64) {
        let lr = 0.001 * reward;

        for h in 0..self.hidden_size {
            let hv = self.last_hidden[h];
            for i in 0..self.input_size.min(inputs.len()) {
                self.weights_ih[[i, h]] += lr * inputs[i] * hv;
            }
            self.bias_h[h] += lr * hv;
        }

        for o in 0..self.output_size.min(outputs.len()) {
            let ov = outputs[o];
            for h in 0..self.hidden_size {
                self.weights_ho[[h, o]] += lr * self.last_hidden[h] * ov;
            }
            self.bias_o[o] += lr * ov;
        }
    }

    /// Clear all weights and biases.
    pub fn zero(&mut self) {
        self.weights_ih.fill(0.0);
        self.bias_h.fill(0.0);
        self.weights_ho.fill(0.0);
        self.bias_o.fill(0.0);
    }

    /// Total parameter count (weights + biases).
    pub fn parameter_count(&self) -> usize {
        self.weights_ih.len() + self.bias_h.len() + self.weights_ho.len() + self.bias_o.len()
    }

    /// Check for NaN/Inf contamination.
    pub fn is_valid(&self) -> bool {
        self.weights_ih.iter().all(|w| w.is_finite())
            && self.bias_h.iter().all(|b| b.is_finite())
            && self.weights_ho.iter().all(|w| w.is_finite())
            && self.bias_o.iter().all(|b| b.is_finite())
    }
}

/// Wire-format view of a network, matching the genome exchange document.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetDoc {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    #[serde(rename = "weightsIH")]
    weights_ih: Vec<Vec<f64>>,
    #[serde(rename = "weightsHO")]
    weights_ho: Vec<Vec<f64>>,
    bias_h: Vec<f64>,
    bias_o: Vec<f64>,
}

impl From<&NeuralNet> for NetDoc {
    fn from(net: &NeuralNet) -> Self {
        Self {
            input_size: net.input_size,
            hidden_size: net.hidden_size,
            output_size: net.output_size,
            weights_ih: net.weights_ih.outer_iter().map(|r| r.to_vec()).collect(),
            weights_ho: net.weights_ho.outer_iter().map(|r| r.to_vec()).collect(),
            bias_h: net.bias_h.to_vec(),
            bias_o: net.bias_o.to_vec(),
        }
    }
}

impl TryFrom<NetDoc> for NeuralNet {
    type Error = String;

    fn try_from(doc: NetDoc) -> Result<Self, String> {
        fn matrix(rows: &[Vec<f64>], nrows: usize, ncols: usize) -> Result<Array2<f64>, String> {
            if rows.len() != nrows {
                return Err(format!("expected {} weight rows, found {}", nrows, rows.len()));
            }
            let mut out = Array2::zeros((nrows, ncols));
            for (i, row) in rows.iter().enumerate() {
                if row.len() != ncols {
                    return Err(format!("weight row {} has {} columns, expected {}", i, row.len(), ncols));
                }
                for (j, &v) in row.iter().enumerate() {
                    out[[i, j]] = v;
                }
            }
            Ok(out)
        }

        if doc.bias_h.len() != doc.hidden_size || doc.bias_o.len() != doc.output_size {
            return Err("bias vector length does not match layer size".to_string());
        }

        Ok(Self {
            input_size: doc.input_size,
            hidden_size: doc.hidden_size,
            output_size: doc.output_size,
            weights_ih: matrix(&doc.weights_ih, doc.input_size, doc.hidden_size)?,
            weights_ho: matrix(&doc.weights_ho, doc.hidden_size, doc.output_size)?,
            bias_h: Array1::from_vec(doc.bias_h),
            bias_o: Array1::from_vec(doc.bias_o),
            last_hidden: Array1::zeros(doc.hidden_size),
        })
    }
}

impl Serialize for NeuralNet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        NetDoc::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NeuralNet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let doc = NetDoc::deserialize(deserializer)?;
        NeuralNet::try_from(doc).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_forward_output_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut net = NeuralNet::new(6, 4, 3, &mut rng);

        let outputs = net.forward(&[0.3, -0.7, 1.0, 0.0, 2.5, -1.0]);
        assert_eq!(outputs.len(), 3);
        assert!(outputs.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert!(net.last_hidden.iter().all(|&h| h >= 0.0));
    }

    #[test]
    fn test_forward_zero_network() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut net = NeuralNet::new(4, 3, 2, &mut rng);
        net.zero();

        let outputs = net.forward(&[1.0, 2.0, 3.0, 4.0]);
        assert!(outputs.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_mutate_zero_rate_is_noop() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut net = NeuralNet::new(5, 4, 3, &mut rng);
        let before = net.clone();

        net.mutate(0.0, &mut rng);

        assert_eq!(net.weights_ih, before.weights_ih);
        assert_eq!(net.bias_h, before.bias_h);
        assert_eq!(net.weights_ho, before.weights_ho);
        assert_eq!(net.bias_o, before.bias_o);
    }

    #[test]
    fn test_mutate_full_rate_perturbs() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut net = NeuralNet::new(5, 4, 3, &mut rng);
        let before = net.clone();

        net.mutate(1.0, &mut rng);

        let changed = net
            .weights_ih
            .iter()
            .zip(before.weights_ih.iter())
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(changed, net.weights_ih.len());
    }

    #[test]
    fn test_learn_zero_reward_is_noop() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut net = NeuralNet::new(3, 2, 2, &mut rng);
        let inputs = [0.5, 0.2, 0.9];
        let outputs = net.forward(&inputs);
        let before = net.clone();

        net.learn(&inputs, &outputs, 0.0);

        assert_eq!(net.weights_ih, before.weights_ih);
        assert_eq!(net.weights_ho, before.weights_ho);
    }

    #[test]
    fn test_serde_roundtrip_is_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut net = NeuralNet::new(4, 3, 2, &mut rng);

        let json = serde_json::to_string(&net).unwrap();
        let mut restored: NeuralNet = serde_json::from_str(&json).unwrap();

        assert_eq!(net.weights_ih, restored.weights_ih);
        assert_eq!(net.bias_o, restored.bias_o);

        // Same inputs must produce bit-identical outputs
        let inputs = [0.1, 0.2, 0.3, 0.4];
        assert_eq!(net.forward(&inputs), restored.forward(&inputs));
    }

    #[test]
    fn test_wire_format_key_names() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let net = NeuralNet::new(2, 2, 1, &mut rng);

        let json = serde_json::to_string(&net).unwrap();
        for key in [
            "\"inputSize\"",
            "\"hiddenSize\"",
            "\"outputSize\"",
            "\"weightsIH\"",
            "\"weightsHO\"",
            "\"biasH\"",
            "\"biasO\"",
        ] {
            assert!(json.contains(key), "missing {} in {}", key, json);
        }
        assert!(!json.contains("weightsIh"));
        assert!(!json.contains("weightsHo"));
    }

    #[test]
    fn test_float_parsing_preserves_last_ulp() {
        // Shortest decimal forms whose nearest doubles differ in the last
        // ULP from what a fast lossy parse produces
        let json = "[0.9281723065870361,-0.10038596266676207]";
        let values: Vec<f64> = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&values).unwrap(), json);
    }

    #[test]
    fn test_deserialize_rejects_bad_shape() {
        let json = r#"{
            "inputSize": 2, "hiddenSize": 2, "outputSize": 1,
            "weightsIH": [[0.0, 0.0]],
            "weightsHO": [[0.0], [0.0]],
            "biasH": [0.0, 0.0], "biasO": [0.0]
        }"#;
        assert!(serde_json::from_str::<NeuralNet>(json).is_err());
    }
}
