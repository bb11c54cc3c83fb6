use uuid::Uuid;

use crate::layer::LayerId;

/// Fresh, globally unique layer id.
pub fn generate_layer_id() -> LayerId {
    LayerId::new(Uuid::new_v4().to_string())
}
