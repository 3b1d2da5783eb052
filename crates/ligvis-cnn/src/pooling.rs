//! Volumetric pooling and convolution built from Candle primitives.
//!
//! Candle has no 3D convolution, so depth is handled by running one 2D
//! convolution per kernel slice over depth-stacked input and summing. Both
//! operations are composed from differentiable ops, so gradients flow back
//! to the input grid.

use candle_core::{Result, Tensor};

use crate::config::PoolMode;

/// Non-overlapping cubic pooling of a `(batch, channels, d, h, w)` tensor.
///
/// Trailing voxels that do not fill a window are dropped.
pub fn pool3d(x: &Tensor, size: usize, mode: PoolMode) -> Result<Tensor> {
    let (b, c, d, h, w) = x.dims5()?;
    let (od, oh, ow) = (d / size, h / size, w / size);

    let x = x
        .narrow(2, 0, od * size)?
        .narrow(3, 0, oh * size)?
        .narrow(4, 0, ow * size)?
        .contiguous()?
        .reshape(vec![b, c, od, size, oh, size, ow, size])?;

    let pooled = match mode {
        PoolMode::Max => {
            // Tied maxima split the window evenly, so the backward pass hands
            // out the upstream gradient once rather than once per tie.
            let winners = window_maxima(&x.detach())?;
            let counts = window_sum(&winners)?;
            window_sum(&x.mul(&winners.broadcast_div(&counts)?)?)?
        }
        PoolMode::Avg => x.mean_keepdim(7)?.mean_keepdim(5)?.mean_keepdim(3)?,
    };
    pooled.reshape((b, c, od, oh, ow))
}

/// 1.0 where a voxel equals its window maximum, 0.0 elsewhere.
fn window_maxima(x: &Tensor) -> Result<Tensor> {
    let max = x.max_keepdim(7)?.max_keepdim(5)?.max_keepdim(3)?;
    x.broadcast_eq(&max)?.to_dtype(x.dtype())
}

fn window_sum(x: &Tensor) -> Result<Tensor> {
    x.sum_keepdim(7)?.sum_keepdim(5)?.sum_keepdim(3)
}

/// Stride-1 3D convolution with a cubic kernel and symmetric zero padding.
///
/// # Arguments
/// * `x` - Tensor of shape (batch, in_channels, d, h, w)
/// * `weight` - Tensor of shape (out_channels, in_channels, k, k, k)
/// * `bias` - Tensor of shape (out_channels)
///
/// # Returns
/// Tensor of shape (batch, out_channels, d + 2p - k + 1, ...)
pub fn conv3d(x: &Tensor, weight: &Tensor, bias: &Tensor, pad: usize) -> Result<Tensor> {
    let (b, c, _, _, _) = x.dims5()?;
    let (o, _, k, _, _) = weight.dims5()?;

    let x = if pad > 0 { x.pad_with_zeros(2, pad, pad)? } else { x.clone() };
    let depth = x.dim(2)?;
    let out_depth = depth + 1 - k;

    let mut acc: Option<Tensor> = None;
    for kd in 0..k {
        // (b, c, out_depth, h, w) -> (b * out_depth, c, h, w)
        let slab = x.narrow(2, kd, out_depth)?.permute((0, 2, 1, 3, 4))?.contiguous()?;
        let (_, _, _, h, w) = slab.dims5()?;
        let slab = slab.reshape((b * out_depth, c, h, w))?;
        let kernel = weight.narrow(2, kd, 1)?.squeeze(2)?.contiguous()?;
        let y = slab.conv2d(&kernel, pad, 1, 1, 1)?;
        acc = Some(match acc {
            Some(sum) => (sum + y)?,
            None => y,
        });
    }
    let y = match acc {
        Some(y) => y,
        None => candle_core::bail!("conv3d kernel has zero depth"),
    };

    let (_, _, oh, ow) = y.dims4()?;
    let y = y
        .reshape((b, out_depth, o, oh, ow))?
        .permute((0, 2, 1, 3, 4))?
        .contiguous()?;
    y.broadcast_add(&bias.reshape((1, o, 1, 1, 1))?)
}
