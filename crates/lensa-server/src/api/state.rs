//! Shared application state: one optional capability per service.

use std::sync::Arc;

use tracing::{info, warn};

use lensa_core::{IdCardService, ImageToText, LensaConfig, NsfwDetector};

/// Services available to the handlers. A `None` service answers 503.
#[derive(Clone)]
pub struct AppState {
    pub nsfw: Option<Arc<NsfwDetector>>,
    pub caption: Option<Arc<ImageToText>>,
    pub id_card: Option<Arc<IdCardService>>,
    pub max_upload_bytes: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            nsfw: None,
            caption: None,
            id_card: None,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nsfw(mut self, detector: NsfwDetector) -> Self {
        self.nsfw = Some(Arc::new(detector));
        self
    }

    pub fn with_caption(mut self, captioner: ImageToText) -> Self {
        self.caption = Some(Arc::new(captioner));
        self
    }

    pub fn with_id_card(mut self, service: IdCardService) -> Self {
        self.id_card = Some(Arc::new(service));
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Load every enabled service. Failures are logged and leave that service unavailable.
    pub fn from_config(config: &LensaConfig) -> Self {
        let mut state = Self::new().with_max_upload_bytes(config.server.max_upload_bytes);

        if config.nsfw.enabled {
            match lensa_core::create_nsfw_detector(config) {
                Ok(detector) => {
                    info!("NSFW detection service initialized");
                    state = state.with_nsfw(detector);
                }
                Err(e) => warn!("Failed to initialize NSFW detection service: {}", e),
            }
        }

        if config.caption.enabled {
            match lensa_core::create_captioner(config) {
                Ok(captioner) => {
                    info!("Image to text service initialized");
                    state = state.with_caption(captioner);
                }
                Err(e) => warn!("Failed to initialize image to text service: {}", e),
            }
        }

        if config.id_card.enabled {
            match lensa_core::create_id_card_service(config) {
                Ok(service) => {
                    info!("ID card service initialized");
                    state = state.with_id_card(service);
                }
                Err(e) => warn!("Failed to initialize ID card service: {}", e),
            }
        }

        state
    }
}
