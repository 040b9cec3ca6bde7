use std::collections::HashMap;

use prometheus::Registry;

use crate::scaling_metadata::ScalingMetadata;

pub const NAMESPACE: &str = "lagscaler";

pub const LABEL_GROUP: &str = "group";
pub const LABEL_TRIGGER_INDEX: &str = "trigger_index";

/// Create the [`Registry`] for the metrics describing the scaler itself.
///
/// Every metric is labeled with the Consumer Group and the trigger index.
pub fn init(metadata: &ScalingMetadata) -> Registry {
    let prom_def_labels = HashMap::from([
        (LABEL_GROUP.to_string(), metadata.consumer_group().to_string()),
        (LABEL_TRIGGER_INDEX.to_string(), metadata.trigger_index().to_string()),
    ]);

    info!("Prometheus Metrics default labels:\n{:#?}", prom_def_labels);

    Registry::new_custom(Some(NAMESPACE.to_string()), Some(prom_def_labels))
        .expect("Unable to create a Prometheus Metrics Registry")
}
