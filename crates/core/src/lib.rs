//! Face mask detection pipeline.
//!
//! Locates faces in an image, classifies each face as masked or unmasked,
//! and reduces the per-face results into a single [`Verdict`].
//!
//! [`Verdict`]: pipeline::verdict::Verdict

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod error;
    pub mod execution_provider;
    pub mod frame;
    pub mod model_resolver;
}

pub mod input {
    pub mod domain {
        pub mod image_decoder;
        pub mod image_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod face_locator;
    }
    pub mod infrastructure;
}

pub mod classification {
    pub mod domain {
        pub mod classification_result;
        pub mod face_normalizer;
        pub mod mask_classifier;
    }
    pub mod infrastructure;
}

pub mod models {
    pub mod model_registry;
    pub mod model_slot;
    pub mod onnx_models;
}

pub mod pipeline {
    pub mod detect_masks_use_case;
    pub mod mask_detection_service;
    pub mod pipeline_config;
    pub mod status_reporter;
    pub mod timeout;
    pub mod verdict;
}
