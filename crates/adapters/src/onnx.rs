//! ONNX Runtime session adapter.

use onnx_transformers_domain::{Dimension, ElementType, ExecutionProvider, TensorData};
use onnx_transformers_ports::{InferenceSessionPort, NamedTensors, Tensor, TensorSpec};
use onnx_transformers_shared::{ErrorEnvelope, Result, ResultExt};
use ort::memory::{AllocationDevice, AllocatorType, MemoryInfo, MemoryType};
use ort::session::builder::SessionBuilder;
use ort::session::{Session, SessionInputValue, SessionInputs, SessionOutputs};
use ort::tensor::TensorElementType;
use ort::value::{DynValue, TensorRef, ValueType};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A loaded ONNX graph.
///
/// `Session::run` needs exclusive access, so calls are serialised behind a
/// mutex and the adapter can be shared across threads.
pub struct OrtSession {
    session: Mutex<Session>,
    inputs: Vec<TensorSpec>,
    outputs: Vec<TensorSpec>,
    provider: ExecutionProvider,
}

impl fmt::Debug for OrtSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OrtSession")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl OrtSession {
    /// Load a graph, registering the accelerator when requested and available.
    pub fn load(path: &Path, requested: ExecutionProvider) -> Result<Self> {
        if !path.is_file() {
            return Err(ErrorEnvelope::configuration("missing_file", "ONNX model file not found")
                .with_metadata("path", path.to_string_lossy().to_string()));
        }

        let builder = Session::builder().map_err(map_ort_error("session_load_failed"))?;
        let (builder, provider) = configure_provider(builder, requested)?;
        let session = builder
            .commit_from_file(path)
            .map_err(map_ort_error("session_load_failed"))
            .with_error_path(path)?;

        let inputs = session.inputs().iter().map(tensor_spec).collect();
        let outputs = session.outputs().iter().map(tensor_spec).collect();

        Ok(Self {
            session: Mutex::new(session),
            inputs,
            outputs,
            provider,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Session>> {
        self.session
            .lock()
            .map_err(|_| ErrorEnvelope::inference("run_failed", "ONNX session lock poisoned"))
    }

    fn collect_outputs(&self, outputs: &SessionOutputs<'_>) -> Result<Vec<Tensor>> {
        self.outputs
            .iter()
            .map(|spec| {
                let value = outputs.get(spec.name.as_str()).ok_or_else(|| {
                    ErrorEnvelope::inference("output_extract_failed", "ONNX model output missing")
                        .with_metadata("output", spec.name.clone())
                })?;
                extract_tensor(&spec.name, value)
            })
            .collect()
    }
}

impl InferenceSessionPort for OrtSession {
    fn inputs(&self) -> &[TensorSpec] {
        &self.inputs
    }

    fn outputs(&self) -> &[TensorSpec] {
        &self.outputs
    }

    fn execution_provider(&self) -> ExecutionProvider {
        self.provider
    }

    fn run(&self, feeds: &NamedTensors) -> Result<Vec<Tensor>> {
        let session_inputs = build_session_inputs(feeds)?;
        let mut session = self.lock()?;
        let outputs = session
            .run(session_inputs)
            .map_err(map_ort_error("run_failed"))?;
        self.collect_outputs(&outputs)
    }

    fn run_bound(&self, feeds: &NamedTensors) -> Result<Vec<Tensor>> {
        let values = feeds
            .iter()
            .map(|(name, tensor)| Ok((name, owned_value(tensor)?)))
            .collect::<Result<Vec<_>>>()?;
        let host = MemoryInfo::new(
            AllocationDevice::CPU,
            0,
            AllocatorType::Device,
            MemoryType::CPUOutput,
        )
        .map_err(map_ort_error("binding_failed"))?;

        let mut session = self.lock()?;
        let mut binding = session
            .create_binding()
            .map_err(map_ort_error("binding_failed"))?;
        for (name, value) in &values {
            binding
                .bind_input(*name, value)
                .map_err(map_ort_error("binding_failed"))?;
        }
        for spec in &self.outputs {
            binding
                .bind_output_to_device(spec.name.as_str(), &host)
                .map_err(map_ort_error("binding_failed"))?;
        }

        let outputs = session
            .run_binding(&binding)
            .map_err(map_ort_error("run_failed"))?;
        self.collect_outputs(&outputs)
    }
}

#[cfg(feature = "cuda")]
fn configure_provider(
    builder: SessionBuilder,
    requested: ExecutionProvider,
) -> Result<(SessionBuilder, ExecutionProvider)> {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider as _};

    if !requested.is_accelerator() {
        return Ok((builder, ExecutionProvider::Cpu));
    }

    let cuda = CUDAExecutionProvider::default();
    if !cuda.is_available().unwrap_or(false) {
        tracing::warn!("CUDA execution provider requested but unavailable, running on CPU");
        return Ok((builder, ExecutionProvider::Cpu));
    }

    let builder = builder
        .with_execution_providers([cuda.build().error_on_failure()])
        .map_err(map_ort_error("session_load_failed"))?;
    Ok((builder, ExecutionProvider::Accelerator))
}

#[cfg(not(feature = "cuda"))]
#[expect(
    clippy::unnecessary_wraps,
    reason = "matches the signature of the cuda-enabled variant"
)]
fn configure_provider(
    builder: SessionBuilder,
    requested: ExecutionProvider,
) -> Result<(SessionBuilder, ExecutionProvider)> {
    if requested.is_accelerator() {
        tracing::warn!(
            "CUDA execution provider requested but this build lacks the `cuda` feature, running on CPU"
        );
    }
    Ok((builder, ExecutionProvider::Cpu))
}

fn tensor_spec(outlet: &ort::value::Outlet) -> TensorSpec {
    match outlet.dtype() {
        ValueType::Tensor { ty, shape, .. } => {
            let dims = shape
                .iter()
                .enumerate()
                .map(|(axis, extent)| {
                    if *extent >= 0 {
                        Dimension::Fixed(*extent)
                    } else {
                        Dimension::Symbolic(format!("{}_dim_{axis}", outlet.name()))
                    }
                })
                .collect();
            TensorSpec::new(outlet.name(), element_type(*ty), dims)
        },
        other => TensorSpec::new(
            outlet.name(),
            ElementType::Other(format!("{other:?}")),
            Vec::new(),
        ),
    }
}

fn element_type(ty: TensorElementType) -> ElementType {
    match ty {
        TensorElementType::Int64 => ElementType::Int64,
        TensorElementType::Int32 => ElementType::Int32,
        TensorElementType::Float32 => ElementType::Float32,
        TensorElementType::Float16 => ElementType::Float16,
        TensorElementType::Float64 => ElementType::Float64,
        TensorElementType::Bool => ElementType::Bool,
        other => ElementType::Other(format!("{other:?}").to_ascii_lowercase()),
    }
}

fn build_session_inputs(feeds: &NamedTensors) -> Result<SessionInputs<'_, '_>> {
    let mut session_inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
        Vec::with_capacity(feeds.len());
    for (name, tensor) in feeds.iter() {
        let shape = tensor.shape().to_vec();
        let value: SessionInputValue<'_> = match tensor.data() {
            TensorData::Int64(values) => TensorRef::from_array_view((shape, values.as_slice()))
                .map_err(map_ort_error("invalid_tensor"))?
                .into(),
            TensorData::Int32(values) => TensorRef::from_array_view((shape, values.as_slice()))
                .map_err(map_ort_error("invalid_tensor"))?
                .into(),
            TensorData::Float32(values) => TensorRef::from_array_view((shape, values.as_slice()))
                .map_err(map_ort_error("invalid_tensor"))?
                .into(),
        };
        session_inputs.push((Cow::Borrowed(name), value));
    }
    Ok(session_inputs.into())
}

fn owned_value(tensor: &Tensor) -> Result<DynValue> {
    let shape = tensor.shape().to_vec();
    let value = match tensor.data() {
        TensorData::Int64(values) => ort::value::Tensor::from_array((shape, values.clone()))
            .map_err(map_ort_error("invalid_tensor"))?
            .into_dyn(),
        TensorData::Int32(values) => ort::value::Tensor::from_array((shape, values.clone()))
            .map_err(map_ort_error("invalid_tensor"))?
            .into_dyn(),
        TensorData::Float32(values) => ort::value::Tensor::from_array((shape, values.clone()))
            .map_err(map_ort_error("invalid_tensor"))?
            .into_dyn(),
    };
    Ok(value)
}

fn extract_tensor(name: &str, value: &DynValue) -> Result<Tensor> {
    let ValueType::Tensor { ty, .. } = value.dtype() else {
        return Err(unsupported_output(name, "non-tensor"));
    };
    let tensor = match ty {
        TensorElementType::Float32 => {
            let (shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(map_ort_error("output_extract_failed"))?;
            Tensor::from_f32(host_shape(name, shape)?, data.to_vec())
        },
        TensorElementType::Int64 => {
            let (shape, data) = value
                .try_extract_tensor::<i64>()
                .map_err(map_ort_error("output_extract_failed"))?;
            Tensor::from_i64(host_shape(name, shape)?, data.to_vec())
        },
        TensorElementType::Int32 => {
            let (shape, data) = value
                .try_extract_tensor::<i32>()
                .map_err(map_ort_error("output_extract_failed"))?;
            Tensor::from_i32(host_shape(name, shape)?, data.to_vec())
        },
        other => return Err(unsupported_output(name, &format!("{other:?}"))),
    };
    tensor.map_err(ErrorEnvelope::from)
}

fn host_shape(name: &str, shape: &ort::tensor::Shape) -> Result<Vec<usize>> {
    shape
        .iter()
        .map(|extent| {
            usize::try_from(*extent).map_err(|_| {
                ErrorEnvelope::inference("output_extract_failed", "negative output extent")
                    .with_metadata("output", name)
            })
        })
        .collect()
}

fn unsupported_output(name: &str, element_type: &str) -> ErrorEnvelope {
    ErrorEnvelope::inference(
        "unsupported_output_type",
        format!("output `{name}` has unsupported element type {element_type}"),
    )
    .with_metadata("output", name)
}

fn map_ort_error<E: fmt::Display>(code: &'static str) -> impl FnOnce(E) -> ErrorEnvelope {
    move |error| {
        ErrorEnvelope::inference(code, format!("ONNX runtime error: {error}"))
            .with_metadata("engine", "onnxruntime")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnx_transformers_shared::ErrorCode;

    #[test]
    fn missing_graph_is_a_configuration_error() {
        let error = OrtSession::load(Path::new("does/not/exist.onnx"), ExecutionProvider::Cpu).err();
        assert!(error.is_some_and(|error| error.code == ErrorCode::configuration("missing_file")));
    }

    #[test]
    fn element_types_map_onto_the_domain() {
        assert_eq!(element_type(TensorElementType::Int64), ElementType::Int64);
        assert_eq!(element_type(TensorElementType::Float16), ElementType::Float16);
        assert!(matches!(
            element_type(TensorElementType::String),
            ElementType::Other(_)
        ));
    }

    #[test]
    fn ort_errors_become_inference_errors() {
        let error = map_ort_error("run_failed")("boom");
        assert!(error.is_inference_error());
        assert_eq!(error.code.code(), "run_failed");
    }
}
