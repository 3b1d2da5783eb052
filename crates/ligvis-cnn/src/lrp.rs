//! Layer-wise relevance propagation (ε-rule).
//!
//! Relevance starts at the score-class logit and is pushed back layer by
//! layer. For a redistributing layer with input `a`, pre-activation output
//! `z` and output relevance `R`:
//!
//! ```text
//! s    = R / (z + ε·sign(z))
//! R_in = a ⊙ ∂(z · s)/∂a        (s held constant)
//! ```
//!
//! which is the ε-rule written as a gradient, so one rule covers dense,
//! convolution and pooling layers. ReLU and flatten pass relevance through.
//! Total relevance is conserved up to what biases and ε absorb.

use candle_core::{DType, Tensor, Var};

use crate::error::{CnnError, Result};
use crate::network::{Layer, Network};

pub const LRP_EPSILON: f64 = 1e-4;

/// Relevance of the score-class logit only; other outputs start at zero.
pub fn output_relevance(logits: &Tensor, score_class: usize) -> Result<Tensor> {
    let (batch, outputs) = logits.dims2()?;
    let mut mask = vec![0f32; batch * outputs];
    for b in 0..batch {
        mask[b * outputs + score_class] = 1.0;
    }
    let mask = Tensor::from_vec(mask, (batch, outputs), logits.device())?;
    Ok(logits.detach().mul(&mask)?)
}

/// Propagate `relevance` (shaped like the network output) back to the input.
///
/// `activations` must come from [`Network::forward_with_activations`].
pub fn propagate(network: &Network, activations: &[Tensor], relevance: Tensor) -> Result<Tensor> {
    let layers = network.layers();
    if activations.len() != layers.len() + 1 {
        return Err(CnnError::Inference(format!(
            "expected {} activations, got {}",
            layers.len() + 1,
            activations.len()
        )));
    }

    let mut relevance = relevance;
    for (layer, input) in layers.iter().zip(activations).rev() {
        relevance = if layer.redistributes() {
            epsilon_rule(layer, input, &relevance)?
        } else {
            relevance.reshape(input.shape())?
        };
    }
    Ok(relevance)
}

fn epsilon_rule(layer: &Layer, input: &Tensor, relevance: &Tensor) -> Result<Tensor> {
    let a = Var::from_tensor(&input.detach())?;
    let z = layer.forward(a.as_tensor())?;

    let zd = z.detach();
    let stabilizer = zd
        .ge(&zd.zeros_like()?)?
        .to_dtype(DType::F32)?
        .affine(2.0 * LRP_EPSILON, -LRP_EPSILON)?;
    let s = relevance.div(&(zd + stabilizer)?)?.detach();

    let objective = z.mul(&s)?.sum_all()?;
    let grads = objective.backward()?;
    let c = grads
        .get(a.as_tensor())
        .ok_or_else(|| CnnError::Inference(format!("no relevance gradient through {}", layer.name())))?;
    Ok(a.as_tensor().detach().mul(c)?)
}
