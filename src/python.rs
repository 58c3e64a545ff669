use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray1, PyArray2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::{Execution, Parameters, SimulationConfig};
use crate::core::{EnsembleResult, EnsembleRunner};
use crate::error::Error;

fn py_err(e: Error) -> PyErr {
    match e {
        Error::InvalidParam(_) => PyValueError::new_err(e.to_string()),
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn parse_execution(name: &str) -> PyResult<Execution> {
    match name {
        "serial" => Ok(Execution::Serial),
        "parallel-cells" => Ok(Execution::ParallelCells),
        "parallel-realizations" => Ok(Execution::ParallelRealizations),
        other => Err(PyValueError::new_err(format!(
            "unknown execution '{other}'; expected serial, parallel-cells or parallel-realizations"
        ))),
    }
}

/// Python-facing wrapper around the ensemble runner.
///
/// API:
/// - __new__(uw=0.2, tw=1.0, n0=0.001, n_particles=50000, n_sim=2, n_cell=50,
///   n_mft=20, n_t=200, n_z=10, v_rel_max=6.0, seed=17, execution="serial")
/// - run() -> np.ndarray, shape (n_sim, n_t)
/// - mean() -> np.ndarray, shape (n_t,)
/// - time_axis() -> np.ndarray, shape (n_t,), in mean-free times
#[pyclass]
pub struct DsmcSim {
    params: Parameters,
    result: Option<EnsembleResult>,
}

#[pymethods]
impl DsmcSim {
    /// Validate the configuration and derive the box geometry.
    ///
    /// Errors: raises ValueError on invalid parameters.
    #[new]
    #[pyo3(signature = (
        uw=0.2, tw=1.0, n0=0.001, n_particles=50_000, n_sim=2, n_cell=50,
        n_mft=20, n_t=200, n_z=10, v_rel_max=6.0, seed=17, execution="serial"
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        uw: f64,
        tw: f64,
        n0: f64,
        n_particles: usize,
        n_sim: usize,
        n_cell: usize,
        n_mft: usize,
        n_t: usize,
        n_z: usize,
        v_rel_max: f64,
        seed: u64,
        execution: &str,
    ) -> PyResult<Self> {
        let config = SimulationConfig {
            uw,
            tw,
            n0,
            n_particles,
            n_sim,
            n_cell,
            n_mft,
            n_t,
            n_z,
            v_rel_max,
            seed,
            execution: parse_execution(execution)?,
        };
        let params = Parameters::from_config(&config).map_err(py_err)?;
        Ok(Self {
            params,
            result: None,
        })
    }

    /// Run all realizations (releases the GIL) and return the (n_sim, n_t)
    /// matrix of bottom-slab mean v_y. Empty-slab steps are NaN.
    fn run(&mut self, py: Python<'_>) -> PyResult<Py<PyArray2<f64>>> {
        let params = self.params.clone();
        let result = py
            .detach(move || EnsembleRunner::new(params).run())
            .map_err(py_err)?;
        let arr = Array2::from_shape_vec(
            (result.n_realizations(), result.n_steps()),
            result.values().to_vec(),
        )
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        self.result = Some(result);
        Ok(arr.into_pyarray(py).unbind())
    }

    /// Mean over realizations of the last run, NaN entries skipped.
    ///
    /// Errors: raises RuntimeError if run() has not been called.
    fn mean(&self, py: Python<'_>) -> PyResult<Py<PyArray1<f64>>> {
        let result = self
            .result
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("run() has not been called"))?;
        Ok(result.mean_over_realizations().into_pyarray(py).unbind())
    }

    /// Step times in units of the mean-free time.
    fn time_axis(&self, py: Python<'_>) -> Py<PyArray1<f64>> {
        self.params.time_axis().into_pyarray(py).unbind()
    }

    /// Realizations aborted in the last run, as (realization, step, reason).
    fn aborted(&self) -> Vec<(usize, usize, String)> {
        self.result
            .as_ref()
            .map(|r| {
                r.aborted()
                    .iter()
                    .map(|a| (a.realization, a.step, a.reason.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[getter]
    fn lz(&self) -> f64 {
        self.params.lz
    }

    #[getter]
    fn dz(&self) -> f64 {
        self.params.dz
    }

    #[getter]
    fn dt(&self) -> f64 {
        self.params.dt
    }

    #[getter]
    fn tau(&self) -> f64 {
        self.params.tau
    }

    #[getter]
    fn kn(&self) -> f64 {
        self.params.kn
    }

    #[getter]
    fn ne(&self) -> f64 {
        self.params.ne
    }
}

/// The dsmcsim Python module entry point.
#[pymodule]
fn dsmcsim(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<DsmcSim>()?;
    Ok(())
}
