//! Core WASM system wrapper.

use anyhow::{bail, Context, Result};
use phaseline_core::equation_engine::Equation;
use phaseline_core::{iterate, DiscreteMap, Flow, SolverConfig, SolverKind, Steppable};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WasmSystem {
    pub(crate) system: SystemType,
}

pub(crate) enum SystemType {
    Map(DiscreteMap<Equation>),
    Flow(Flow<Equation, SolverKind>),
}

impl Steppable for SystemType {
    fn step(&self, t: &mut f64, state: f64) -> f64 {
        match self {
            SystemType::Map(map) => map.step(t, state),
            SystemType::Flow(flow) => flow.step(t, state),
        }
    }
}

impl SystemType {
    fn set_params(&mut self, params: Vec<f64>) -> Result<()> {
        let equation = match self {
            SystemType::Map(map) => map.map_mut(),
            SystemType::Flow(flow) => flow.deriv_mut(),
        };
        equation
            .set_params(params)
            .context("Failed to update parameters")
    }
}

pub(crate) fn build_system(
    equation: &str,
    var_name: &str,
    param_names: &[String],
    params: Vec<f64>,
    system_type: &str,
    solver_name: &str,
    deltat: f64,
) -> Result<SystemType> {
    let equation = Equation::compile(equation, var_name, param_names, params)
        .with_context(|| format!("Failed to compile equation '{}'", equation))?;

    match system_type {
        "map" => Ok(SystemType::Map(DiscreteMap::new(equation))),
        "flow" => {
            let solver = SolverKind::from_name(solver_name)?;
            let flow = Flow::try_new(equation, solver, SolverConfig { deltat })?;
            Ok(SystemType::Flow(flow))
        }
        other => bail!("Unknown system type '{}'. Expected 'map' or 'flow'.", other),
    }
}

pub(crate) fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}

#[wasm_bindgen]
impl WasmSystem {
    /// `solver_name` and `deltat` are only used when `system_type` is "flow".
    #[wasm_bindgen(constructor)]
    pub fn new(
        equation: String,
        var_name: String,
        param_names: Vec<String>,
        params: Vec<f64>,
        system_type: &str,
        solver_name: &str,
        deltat: f64,
    ) -> Result<WasmSystem, JsValue> {
        console_error_panic_hook::set_once();

        let system = build_system(
            &equation,
            &var_name,
            &param_names,
            params,
            system_type,
            solver_name,
            deltat,
        )
        .map_err(to_js_error)?;
        Ok(WasmSystem { system })
    }

    pub fn is_flow(&self) -> bool {
        matches!(self.system, SystemType::Flow(_))
    }

    pub fn set_params(&mut self, params: Vec<f64>) -> Result<(), JsValue> {
        self.system.set_params(params).map_err(to_js_error)
    }

    pub fn iterate(&self, x0: f64, steps: u32) -> Vec<f64> {
        iterate(&self.system, x0, steps as usize).into_vec()
    }
}
