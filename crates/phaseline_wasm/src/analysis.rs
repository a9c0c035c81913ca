//! Fixed-point, stability and phase-line runners.

use crate::system::{to_js_error, WasmSystem};
use anyhow::Result;
use phaseline_core::{
    dedup_within, find_fixed_points, fixed_point, is_oscillator, is_stable, phase_diagram,
    FixedPointResult, FixedPointSettings, Oscillation, OscillationSettings, PhaseDiagramConfig,
    Stability, StabilitySettings,
};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// Deduplicated fixed points found from a sweep of seeds.
#[derive(Debug, Serialize)]
struct FixedPointSweep {
    values: Vec<f64>,
    unconverged_seeds: Vec<f64>,
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

impl WasmSystem {
    fn fixed_point_sweep(
        &self,
        seeds: &[f64],
        settings: FixedPointSettings,
        dedup_tol: f64,
    ) -> Result<FixedPointSweep> {
        let results = find_fixed_points(&self.system, seeds, settings)?;
        let (converged, unconverged): (Vec<_>, Vec<_>) = seeds
            .iter()
            .zip(&results)
            .partition(|(_, result)| result.converged);

        let values: Vec<f64> = converged.iter().map(|(_, result)| result.value).collect();
        Ok(FixedPointSweep {
            values: dedup_within(&values, dedup_tol),
            unconverged_seeds: unconverged.iter().map(|(seed, _)| **seed).collect(),
        })
    }

    fn classify(
        &self,
        xfix: &[f64],
        neighborhood: f64,
        settings: StabilitySettings,
    ) -> Result<Vec<Stability>> {
        xfix.iter()
            .map(|&x| is_stable(&self.system, x, neighborhood, settings))
            .collect()
    }
}

#[wasm_bindgen]
impl WasmSystem {
    pub fn fixed_point(&self, x0: f64, xtol: f64, max_iter: u32) -> Result<JsValue, JsValue> {
        let settings = FixedPointSettings {
            xtol,
            max_iter: max_iter as usize,
        };
        let result: FixedPointResult =
            fixed_point(&self.system, x0, settings).map_err(to_js_error)?;
        serialize(&result)
    }

    /// Returns `{ values, unconverged_seeds }`; `values` is sorted and merged
    /// within `dedup_tol`.
    pub fn find_fixed_points(
        &self,
        seeds: Vec<f64>,
        xtol: f64,
        max_iter: u32,
        dedup_tol: f64,
    ) -> Result<JsValue, JsValue> {
        let settings = FixedPointSettings {
            xtol,
            max_iter: max_iter as usize,
        };
        let sweep = self
            .fixed_point_sweep(&seeds, settings, dedup_tol)
            .map_err(to_js_error)?;
        serialize(&sweep)
    }

    pub fn is_stable(
        &self,
        xfix: f64,
        neighborhood: f64,
        xtol: f64,
        max_iter: u32,
    ) -> Result<JsValue, JsValue> {
        let settings = StabilitySettings {
            xtol,
            max_iter: max_iter as usize,
        };
        let stability = is_stable(&self.system, xfix, neighborhood, settings).map_err(to_js_error)?;
        serialize(&stability)
    }

    pub fn is_oscillator(
        &self,
        x0: f64,
        max_period: u32,
        xtol: f64,
        max_iter: u32,
    ) -> Result<JsValue, JsValue> {
        let settings = OscillationSettings {
            xtol,
            max_iter: max_iter as usize,
        };
        let oscillation: Oscillation =
            is_oscillator(&self.system, x0, max_period as usize, settings).map_err(to_js_error)?;
        serialize(&oscillation)
    }

    /// Classifies every point in `xfix` and renders the phase line in one go.
    pub fn phase_diagram(
        &self,
        xfix: Vec<f64>,
        neighborhood: f64,
        size: u32,
        offset: u32,
    ) -> Result<String, JsValue> {
        let flags = self
            .classify(&xfix, neighborhood, StabilitySettings::default())
            .map_err(to_js_error)?;
        let config = PhaseDiagramConfig {
            size: size as usize,
            offset: offset as usize,
        };
        phase_diagram(&xfix, &flags, config)
            .map(|diagram| diagram.to_string())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Renders a phase line from precomputed fixed points and an array of
/// `{ left_stable, right_stable }` objects.
#[wasm_bindgen]
pub fn render_phase_diagram(
    xfix: Vec<f64>,
    stability: JsValue,
    size: u32,
    offset: u32,
) -> Result<String, JsValue> {
    let flags: Vec<Stability> = from_value(stability)
        .map_err(|e| JsValue::from_str(&format!("Invalid stability flags: {}", e)))?;
    let config = PhaseDiagramConfig {
        size: size as usize,
        offset: offset as usize,
    };
    phase_diagram(&xfix, &flags, config)
        .map(|diagram| diagram.to_string())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
