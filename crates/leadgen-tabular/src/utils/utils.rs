use std::collections::HashMap;

use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Converts a device string to a Candle Device.
///
/// Supported: `"cpu"`, `"cuda"` (index 0) and `"cuda:N"`.
///
/// # Errors
///
/// Returns an error if the CUDA device is not available or the device type
/// is unsupported.
pub fn get_device(device_str: &str) -> Result<Device> {
    if device_str.starts_with("cuda") {
        let cuda_index = if device_str == "cuda" {
            0
        } else {
            device_str
                .split(':')
                .nth(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0)
        };

        let device = Device::cuda_if_available(cuda_index)?;
        if !device.is_cuda() {
            return Err(anyhow!("CUDA device {} is not available", cuda_index));
        }
        Ok(device)
    } else {
        match device_str {
            "cpu" => Ok(Device::Cpu),
            _ => Err(anyhow!("Unsupported device type: {}", device_str)),
        }
    }
}

/// Overwrite every variable with uniform values in `±1/sqrt(fan_in)`,
/// drawn from a seeded RNG in variable-name order.
pub fn seed_weights(varmap: &VarMap, seed: u64) -> Result<()> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("Variable map lock poisoned"))?;
    let mut names: Vec<&String> = data.keys().collect();
    names.sort();

    let mut rng = StdRng::seed_from_u64(seed);
    for name in names {
        let var = &data[name];
        let shape = var.shape().clone();
        let fan_in = shape.dims().last().copied().unwrap_or(1).max(1);
        let bound = 1.0 / (fan_in as f32).sqrt();
        let values: Vec<f32> = (0..shape.elem_count())
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        var.set(&Tensor::from_vec(values, shape, var.device())?)?;
    }
    Ok(())
}

/// Deep copy of all variables, keyed by name.
pub fn snapshot_weights(varmap: &VarMap) -> Result<HashMap<String, Tensor>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("Variable map lock poisoned"))?;
    data.iter()
        .map(|(name, var)| Ok((name.clone(), var.as_tensor().copy()?)))
        .collect()
}

pub fn restore_weights(varmap: &VarMap, snapshot: &HashMap<String, Tensor>) -> Result<()> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("Variable map lock poisoned"))?;
    for (name, var) in data.iter() {
        let saved = snapshot
            .get(name)
            .ok_or_else(|| anyhow!("Snapshot is missing variable '{}'", name))?;
        var.set(saved)?;
    }
    Ok(())
}
