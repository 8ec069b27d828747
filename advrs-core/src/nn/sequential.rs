use crate::error::AdvrsError;
use crate::nn::module::{DeclaredShape, Module};
use crate::nn::parameter::Parameter;
use crate::tensor::Tensor;

/// Runs named child modules one after another.
#[derive(Debug, Default)]
pub struct Sequential {
    modules: Vec<(String, Box<dyn Module>)>,
}

impl Sequential {
    pub fn new() -> Self {
        Sequential { modules: Vec::new() }
    }

    /// Appends `module` under `name`.
    pub fn add_module(&mut self, name: &str, module: Box<dyn Module>) {
        self.modules.push((name.to_string(), module));
    }

    /// Builder-style variant of [`Sequential::add_module`].
    pub fn with(mut self, name: &str, module: impl Module + 'static) -> Self {
        self.add_module(name, Box::new(module));
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Module for Sequential {
    fn forward(&self, input: &Tensor) -> Result<Tensor, AdvrsError> {
        let mut current = input.clone();
        for (_, module) in &self.modules {
            current = module.forward(&current)?;
        }
        Ok(current)
    }

    fn parameters(&self) -> Vec<Parameter> {
        self.modules.iter().flat_map(|(_, m)| m.parameters()).collect()
    }

    fn named_parameters(&self) -> Vec<(String, Parameter)> {
        let mut params = Vec::new();
        for (name, module) in &self.modules {
            for (param_name, param) in module.named_parameters() {
                params.push((format!("{}.{}", name, param_name), param));
            }
        }
        params
    }

    fn output_shape(&self, input_shape: &[Option<usize>]) -> Result<DeclaredShape, AdvrsError> {
        let mut shape = input_shape.to_vec();
        for (_, module) in &self.modules {
            shape = module.output_shape(&shape)?;
        }
        Ok(shape)
    }
}
