//! Name → constructor lookup for loss layers.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::loss::kld::KldLoss;
use crate::loss::loss_layer::LossLayer;
use crate::loss::loss_param::LossParameter;

pub type LayerCtor = fn(&LossParameter) -> Box<dyn LossLayer>;

fn kld_layer(param: &LossParameter) -> Box<dyn LossLayer> {
    Box::new(KldLoss::new(param))
}

static REGISTRY: Lazy<HashMap<&'static str, LayerCtor>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, LayerCtor> = HashMap::new();
    map.insert(KldLoss::TYPE, kld_layer as LayerCtor);
    map
});

/// Builds the layer registered under `layer_type`.
pub fn create_layer(layer_type: &str, param: &LossParameter) -> Result<Box<dyn LossLayer>> {
    REGISTRY
        .get(layer_type)
        .map(|ctor| ctor(param))
        .ok_or_else(|| Error::UnknownLayerType(layer_type.to_string()))
}

/// Registered type names, sorted.
pub fn layer_types() -> Vec<&'static str> {
    let mut names: Vec<_> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}
